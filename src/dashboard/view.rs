//! Pure rendering of dashboard state into displayable text

use crate::dashboard::filter::ALL_REGIONS;
use crate::dashboard::state::Status;
use crate::dashboard::Dashboard;
use crate::proxy::{ProxyRecord, RegionCounts, NOT_AVAILABLE};

/// Column headers of the proxy table
pub const COLUMNS: [&str; 7] = [
    "Address",
    "Protocol",
    "Latency (s)",
    "Speed",
    "Anonymity",
    "Location",
    "Score",
];

/// Text shown when there is nothing to list
pub const EMPTY_TABLE_TEXT: &str = "No proxies available.";

/// Rendered proxy table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableView {
    /// One formatted row per record
    Rows(Vec<[String; 7]>),
    /// A single message spanning every column
    Empty(&'static str),
}

impl TableView {
    /// Number of table rows, counting the placeholder row
    pub fn row_count(&self) -> usize {
        match self {
            TableView::Rows(rows) => rows.len(),
            TableView::Empty(_) => 1,
        }
    }
}

/// Option of the region selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionOption {
    pub value: String,
    pub label: String,
}

/// Everything the front-end needs to draw one frame
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub status: Status,
    pub total: u64,
    pub active: u64,
    pub region_options: Vec<RegionOption>,
    pub table: TableView,
}

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Format `value` with `digits` decimals, rounding halves away from zero.
///
/// `format!("{:.2}", ..)` rounds exact halves to even, so `0.125` would
/// print as `0.12`; this prints `0.13`.
pub fn to_fixed(value: f64, digits: usize) -> String {
    let scale = 10f64.powi(digits as i32);
    let rounded = (value * scale).round() / scale;
    format!("{:.*}", digits, rounded)
}

/// Format one record into its seven cells
pub fn format_row(record: &ProxyRecord) -> [String; 7] {
    [
        record.proxy.clone(),
        record.protocol.clone(),
        or_na(record.latency.map(|v| to_fixed(v, 3))),
        or_na(record.speed.map(|v| to_fixed(v, 2))),
        or_na(record.anonymity_level().map(str::to_string)),
        or_na(record.region().map(str::to_string)),
        or_na(record.score.map(|v| to_fixed(v, 0))),
    ]
}

pub fn render_table(records: &[ProxyRecord]) -> TableView {
    if records.is_empty() {
        TableView::Empty(EMPTY_TABLE_TEXT)
    } else {
        TableView::Rows(records.iter().map(format_row).collect())
    }
}

/// Selector options: "All" first, then every region with its count
pub fn region_options(regions: &RegionCounts) -> Vec<RegionOption> {
    let mut options = vec![RegionOption {
        value: ALL_REGIONS.to_string(),
        label: ALL_REGIONS.to_string(),
    }];
    options.extend(regions.iter().map(|(region, count)| RegionOption {
        value: region.clone(),
        label: format!("{} ({})", region, count),
    }));
    options
}

pub fn render(dashboard: &Dashboard) -> DashboardView {
    let state = dashboard.state();
    DashboardView {
        status: dashboard.status().clone(),
        total: state.total,
        active: state.active,
        region_options: region_options(&state.regions),
        table: render_table(&state.displayed),
    }
}
