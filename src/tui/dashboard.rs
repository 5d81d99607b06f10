//! TUI for the proxy pool dashboard

use crate::api::FetchRequest;
use crate::dashboard::view::{region_options, DashboardView, TableView, COLUMNS};
use crate::dashboard::{
    Dashboard, FilterState, Operation, Outcome, StatusKind, Ticket, ALL_REGIONS,
};
use crate::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Duration;
use tracing::debug;

/// Widths of the seven table columns
const COLUMN_WIDTHS: [Constraint; 7] = [
    Constraint::Length(22),
    Constraint::Length(9),
    Constraint::Length(12),
    Constraint::Length(8),
    Constraint::Length(12),
    Constraint::Min(10),
    Constraint::Length(6),
];

/// Longest max latency input accepted
const MAX_LATENCY_INPUT_LEN: usize = 8;

const HELP_TEXT: &str = "r refresh | p fetch | s start | x stop | i status | n rotate | m mode | d remove | l logs | \u{2190}/\u{2192} region | 0-9 latency | f filter | c clear | q quit";

/// Values of the filter controls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterControls {
    /// Index into the region options, 0 being "All"
    pub region_index: usize,
    /// Raw max latency text, in milliseconds
    pub latency_input: String,
}

/// Dashboard TUI application state
pub struct DashboardApp {
    dashboard: Dashboard,
    /// Shown in the title bar
    source: String,
    tick_rate: Duration,
    controls: FilterControls,
    table_state: TableState,
    outcome_tx: UnboundedSender<(Ticket, Outcome)>,
    outcome_rx: UnboundedReceiver<(Ticket, Outcome)>,
    should_quit: bool,
}

impl DashboardApp {
    /// Create a new dashboard TUI application
    pub fn new(dashboard: Dashboard, source: impl Into<String>, tick_rate: Duration) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            dashboard,
            source: source.into(),
            tick_rate,
            controls: FilterControls::default(),
            table_state: TableState::default(),
            outcome_tx,
            outcome_rx,
            should_quit: false,
        }
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn controls(&self) -> &FilterControls {
        &self.controls
    }

    /// Run the TUI application
    pub async fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.run_app(&mut terminal).await;

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    async fn run_app<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        // Load the pool once on start-up
        self.spawn(Operation::Refresh);

        loop {
            terminal.draw(|f| self.ui(f))?;

            if event::poll(self.tick_rate)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        if let Some(operation) = self.handle_input(key.code) {
                            self.spawn(operation);
                        }
                        if self.should_quit {
                            break;
                        }
                    }
                }
            }

            while let Ok((ticket, outcome)) = self.outcome_rx.try_recv() {
                self.apply_outcome(ticket, outcome);
            }
        }

        Ok(())
    }

    /// Issue an operation and run its request on a background task
    fn spawn(&mut self, operation: Operation) {
        let (ticket, request) = self.dashboard.dispatch(operation);
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let outcome = request.await;
            // The receiver only goes away when the app is shutting down
            let _ = tx.send((ticket, outcome));
        });
    }

    /// Apply a finished operation to the dashboard
    pub fn apply_outcome(&mut self, ticket: Ticket, outcome: Outcome) {
        let is_refresh = ticket.operation == Operation::Refresh;
        let applied = self.dashboard.complete(ticket, outcome);
        if applied && is_refresh && !self.dashboard.status().is_error() {
            // The selector is rebuilt, so it falls back to "All"
            self.controls.region_index = 0;
            self.table_state.select(None);
        }

        // Rows can disappear under the selection
        let len = self.dashboard.state().displayed.len();
        if self.table_state.selected().is_some_and(|i| i >= len) {
            self.table_state.select(len.checked_sub(1));
        }
    }

    /// Current filter as read from the controls
    pub fn filter(&self) -> FilterState {
        let options = region_options(&self.dashboard.state().regions);
        let region = options
            .get(self.controls.region_index)
            .map_or(ALL_REGIONS, |o| o.value.as_str());
        FilterState::from_controls(region, &self.controls.latency_input)
    }

    /// Handle a key press, returning the pool operation it asks for, if any
    pub fn handle_input(&mut self, key: KeyCode) -> Option<Operation> {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('r') => return Some(Operation::Refresh),
            KeyCode::Char('s') => return Some(Operation::StartService),
            KeyCode::Char('x') => return Some(Operation::StopService),
            KeyCode::Char('i') => return Some(Operation::ServerStatus),
            KeyCode::Char('n') => return Some(Operation::Rotate),
            KeyCode::Char('l') => return Some(Operation::FetchLogs),
            KeyCode::Char('p') => return Some(Operation::FetchPool(FetchRequest::default())),
            KeyCode::Char('m') => {
                let mode = self.dashboard.rotation_mode().toggled();
                return Some(Operation::SetRotationMode(mode));
            }
            KeyCode::Char('d') => {
                let selected = self
                    .table_state
                    .selected()
                    .and_then(|i| self.dashboard.state().displayed.get(i));
                match selected {
                    Some(record) => return Some(Operation::RemoveProxy(record.proxy.clone())),
                    None => debug!("no proxy selected to remove"),
                }
            }
            KeyCode::Char('f') | KeyCode::Enter => {
                let filter = self.filter();
                self.dashboard.apply_filters(&filter);
                self.table_state.select(None);
            }
            KeyCode::Char('c') => {
                self.controls = FilterControls::default();
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' || c == '-' => {
                if self.controls.latency_input.len() < MAX_LATENCY_INPUT_LEN {
                    self.controls.latency_input.push(c);
                }
            }
            KeyCode::Backspace => {
                self.controls.latency_input.pop();
            }
            KeyCode::Right => {
                let count = self.dashboard.state().region_labels.len() + 1;
                self.controls.region_index = (self.controls.region_index + 1) % count;
            }
            KeyCode::Left => {
                let count = self.dashboard.state().region_labels.len() + 1;
                self.controls.region_index = if self.controls.region_index == 0 {
                    count - 1
                } else {
                    self.controls.region_index - 1
                };
            }
            KeyCode::Down => {
                let len = self.dashboard.state().displayed.len();
                let i = match self.table_state.selected() {
                    Some(i) if i + 1 < len => i + 1,
                    _ => 0,
                };
                self.table_state.select(if len == 0 { None } else { Some(i) });
            }
            KeyCode::Up => {
                let len = self.dashboard.state().displayed.len();
                let i = match self.table_state.selected() {
                    Some(0) | None => len.saturating_sub(1),
                    Some(i) => i - 1,
                };
                self.table_state.select(if len == 0 { None } else { Some(i) });
            }
            other => debug!(?other, "unbound key"),
        }
        None
    }

    pub fn ui(&mut self, f: &mut Frame) {
        let view = self.dashboard.view();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Length(3), // Counters and filters
                Constraint::Min(5),    // Proxy table
                Constraint::Length(3), // Status bar
                Constraint::Length(8), // Activity log
                Constraint::Length(1), // Key help
            ])
            .split(f.size());

        let title = Paragraph::new(format!("Proxy Pool Dashboard - {}", self.source))
            .style(Style::default().fg(Color::Cyan))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(title, chunks[0]);

        self.render_summary(f, chunks[1], &view);
        self.render_table(f, chunks[2], &view);

        let status_color = match view.status.kind {
            StatusKind::Error => Color::Red,
            StatusKind::Loading => Color::Yellow,
            StatusKind::Success => Color::Green,
            StatusKind::Idle => Color::White,
        };
        let status = Paragraph::new(view.status.text.clone())
            .style(Style::default().fg(status_color))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Status"));
        f.render_widget(status, chunks[3]);

        self.render_log(f, chunks[4]);

        let help = Paragraph::new(HELP_TEXT).style(Style::default().fg(Color::DarkGray));
        f.render_widget(help, chunks[5]);
    }

    fn render_summary(&self, f: &mut Frame, area: Rect, view: &DashboardView) {
        let summary_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(area);

        let counters = Paragraph::new(format!("Total: {} | Active: {}", view.total, view.active))
            .block(Block::default().borders(Borders::ALL).title("Pool"));
        f.render_widget(counters, summary_chunks[0]);

        let region_label = view
            .region_options
            .get(self.controls.region_index)
            .map_or(ALL_REGIONS, |o| o.label.as_str());
        let latency = if self.controls.latency_input.is_empty() {
            "-"
        } else {
            self.controls.latency_input.as_str()
        };
        let filters = Paragraph::new(format!(
            "Region: < {} > | Max latency (ms): {}",
            region_label, latency
        ))
        .block(Block::default().borders(Borders::ALL).title("Filters"));
        f.render_widget(filters, summary_chunks[1]);
    }

    fn render_table(&mut self, f: &mut Frame, area: Rect, view: &DashboardView) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Proxies ({})", self.dashboard.state().displayed.len()));

        match &view.table {
            TableView::Empty(text) => {
                let empty = Paragraph::new(*text)
                    .alignment(Alignment::Center)
                    .block(block);
                f.render_widget(empty, area);
            }
            TableView::Rows(rows) => {
                let header = Row::new(COLUMNS.to_vec()).style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                );
                let rows: Vec<Row> = rows.iter().map(|cells| Row::new(cells.to_vec())).collect();
                let table = Table::new(rows)
                    .header(header)
                    .block(block)
                    .widths(&COLUMN_WIDTHS)
                    .highlight_style(Style::default().bg(Color::DarkGray))
                    .highlight_symbol(">> ");
                f.render_stateful_widget(table, area, &mut self.table_state);
            }
        }
    }

    fn render_log(&self, f: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .dashboard
            .log()
            .iter()
            .rev() // Show newest first
            .map(|entry| {
                let color = if entry.is_error { Color::Red } else { Color::Gray };
                ListItem::new(entry.display()).style(Style::default().fg(color))
            })
            .collect();

        let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Activity"));
        f.render_widget(list, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        PoolClient, ProxyQuery, ProxySnapshot, RotationMode, ServerStatus, StartServiceRequest,
    };
    use crate::proxy::{ProxyRecord, RegionCounts};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use ratatui::backend::TestBackend;
    use std::sync::Arc;

    /// Pool that always returns the same snapshot
    struct StaticPool(ProxySnapshot);

    #[async_trait]
    impl PoolClient for StaticPool {
        async fn fetch_proxies(&self, _query: &ProxyQuery) -> Result<ProxySnapshot> {
            Ok(self.0.clone())
        }

        async fn start_service(&self, _request: &StartServiceRequest) -> Result<String> {
            Ok(String::new())
        }

        async fn stop_service(&self) -> Result<String> {
            Err(anyhow!("service is not running"))
        }

        async fn server_status(&self) -> Result<ServerStatus> {
            Ok(ServerStatus::default())
        }

        async fn rotate(&self) -> Result<Option<ProxyRecord>> {
            Ok(None)
        }

        async fn fetch_logs(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn trigger_fetch(&self, _request: &FetchRequest) -> Result<String> {
            Ok(String::new())
        }

        async fn set_rotation_mode(&self, _mode: RotationMode) -> Result<String> {
            Ok(String::new())
        }

        async fn remove_proxy(&self, _address: &str) -> Result<String> {
            Ok(String::new())
        }
    }

    fn snapshot() -> ProxySnapshot {
        let mut regions = RegionCounts::new();
        regions.insert("DE".to_string(), 1);
        regions.insert("US".to_string(), 1);
        ProxySnapshot {
            proxies: vec![
                ProxyRecord::new("10.0.0.1:1080", "SOCKS5")
                    .with_latency(0.456)
                    .with_location("US")
                    .with_score(78.0),
                ProxyRecord::new("172.16.0.1:80", "HTTP")
                    .with_latency(1.234)
                    .with_location("DE"),
            ],
            total: 2,
            active: 2,
            regions,
        }
    }

    fn app(snapshot: ProxySnapshot) -> DashboardApp {
        let dashboard = Dashboard::new(Arc::new(StaticPool(snapshot)));
        DashboardApp::new(dashboard, "http://127.0.0.1:5000/api", Duration::from_millis(50))
    }

    async fn refreshed_app() -> DashboardApp {
        let mut app = app(snapshot());
        let (ticket, request) = app.dashboard.dispatch(Operation::Refresh);
        let outcome = request.await;
        app.apply_outcome(ticket, outcome);
        app
    }

    fn screen(app: &mut DashboardApp) -> String {
        let backend = TestBackend::new(120, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| app.ui(f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol.as_str())
            .collect()
    }

    #[test]
    fn test_command_keys_map_to_operations() {
        let mut app = app(ProxySnapshot::default());
        assert_eq!(app.handle_input(KeyCode::Char('r')), Some(Operation::Refresh));
        assert_eq!(app.handle_input(KeyCode::Char('s')), Some(Operation::StartService));
        assert_eq!(app.handle_input(KeyCode::Char('x')), Some(Operation::StopService));
        assert_eq!(app.handle_input(KeyCode::Char('i')), Some(Operation::ServerStatus));
        assert_eq!(app.handle_input(KeyCode::Char('n')), Some(Operation::Rotate));
        assert_eq!(app.handle_input(KeyCode::Char('l')), Some(Operation::FetchLogs));
        assert_eq!(
            app.handle_input(KeyCode::Char('p')),
            Some(Operation::FetchPool(FetchRequest::default()))
        );
        assert_eq!(
            app.handle_input(KeyCode::Char('m')),
            Some(Operation::SetRotationMode(RotationMode::PerRequest))
        );
        assert!(!app.should_quit);
        assert_eq!(app.handle_input(KeyCode::Char('q')), None);
        assert!(app.should_quit);
    }

    #[test]
    fn test_latency_input_editing() {
        let mut app = app(ProxySnapshot::default());
        for c in "500".chars() {
            app.handle_input(KeyCode::Char(c));
        }
        assert_eq!(app.controls().latency_input, "500");
        app.handle_input(KeyCode::Backspace);
        assert_eq!(app.controls().latency_input, "50");
        app.handle_input(KeyCode::Char('c'));
        assert_eq!(app.controls(), &FilterControls::default());
    }

    #[tokio::test]
    async fn test_region_cycling_and_filtering() {
        let mut app = refreshed_app().await;
        assert_eq!(app.filter(), FilterState::default());

        // options are All, DE, US
        app.handle_input(KeyCode::Right);
        app.handle_input(KeyCode::Right);
        assert_eq!(app.filter().region, "US");
        app.handle_input(KeyCode::Right);
        assert_eq!(app.filter().region, "All");
        app.handle_input(KeyCode::Left);
        assert_eq!(app.filter().region, "US");

        app.handle_input(KeyCode::Enter);
        assert_eq!(app.dashboard().state().displayed.len(), 1);
        assert_eq!(app.dashboard().state().displayed[0].proxy, "10.0.0.1:1080");
    }

    #[tokio::test]
    async fn test_refresh_resets_region_selection() {
        let mut app = refreshed_app().await;
        app.handle_input(KeyCode::Right);
        assert_eq!(app.controls().region_index, 1);

        let (ticket, request) = app.dashboard.dispatch(Operation::Refresh);
        let outcome = request.await;
        app.apply_outcome(ticket, outcome);
        assert_eq!(app.controls().region_index, 0);
    }

    #[tokio::test]
    async fn test_draws_table_and_counters() {
        let mut app = refreshed_app().await;
        let screen = screen(&mut app);

        assert!(screen.contains("Proxy Pool Dashboard"));
        assert!(screen.contains("Total: 2 | Active: 2"));
        assert!(screen.contains("10.0.0.1:1080"));
        assert!(screen.contains("0.456"));
        assert!(screen.contains("Proxies refreshed."));
    }

    #[tokio::test]
    async fn test_draws_empty_placeholder() {
        let mut app = app(ProxySnapshot::default());
        let (ticket, request) = app.dashboard.dispatch(Operation::Refresh);
        let outcome = request.await;
        app.apply_outcome(ticket, outcome);

        let screen = screen(&mut app);
        assert!(screen.contains("No proxies available."));
    }

    #[tokio::test]
    async fn test_draws_error_status() {
        let mut app = refreshed_app().await;
        let (ticket, request) = app.dashboard.dispatch(Operation::StopService);
        let outcome = request.await;
        app.apply_outcome(ticket, outcome);

        let screen = screen(&mut app);
        assert!(screen.contains("Failed to stop service."));
        // prior data stays visible
        assert!(screen.contains("10.0.0.1:1080"));
    }

    #[tokio::test]
    async fn test_remove_key_targets_selected_row() {
        let mut app = refreshed_app().await;
        assert_eq!(app.handle_input(KeyCode::Char('d')), None);

        app.handle_input(KeyCode::Down);
        app.handle_input(KeyCode::Down);
        let operation = app.handle_input(KeyCode::Char('d'));
        assert_eq!(operation, Some(Operation::RemoveProxy("172.16.0.1:80".to_string())));

        let (ticket, request) = app.dashboard.dispatch(Operation::RemoveProxy("172.16.0.1:80".to_string()));
        let outcome = request.await;
        app.apply_outcome(ticket, outcome);
        assert_eq!(app.dashboard().state().displayed.len(), 1);
        assert_eq!(app.table_state.selected(), Some(0));
        assert!(!screen(&mut app).contains("172.16.0.1:80 "));
    }
}
