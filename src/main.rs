use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use proxy_dashboard::{
    api::{FetchRequest, HttpPoolClient, PoolClient, ProxyQuery, RotationMode},
    dashboard::{
        view::{render_table, TableView, COLUMNS},
        Dashboard, FilterState, ALL_REGIONS,
    },
    proxy::ProxyParser,
    tui::DashboardApp,
    DashboardConfig,
};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// A terminal dashboard for a proxy pool service
#[derive(Parser)]
#[command(name = "proxy-dashboard")]
#[command(about = "A terminal dashboard for monitoring and controlling a proxy pool service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the pool API
    #[arg(long)]
    api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive TUI
    Tui,
    /// Print the pool's proxies as a table
    List {
        /// Only show proxies from this region
        #[arg(short, long)]
        region: Option<String>,
        /// Only show proxies at or below this latency (ms)
        #[arg(short = 'm', long)]
        max_latency: Option<f64>,
    },
    /// Start the pool's local proxy service
    Start {
        /// HTTP port for the service
        #[arg(long)]
        http_port: Option<u16>,
        /// SOCKS5 port for the service
        #[arg(long)]
        socks5_port: Option<u16>,
    },
    /// Stop the pool's local proxy service
    Stop,
    /// Show service state and pool counters
    Status,
    /// Rotate to the next proxy
    Rotate,
    /// Print pending pool log lines
    Logs,
    /// Have the pool fetch and validate new proxies
    Fetch {
        /// Skip the scraped sources
        #[arg(long)]
        no_scraping: bool,
    },
    /// Set how the service picks the upstream proxy
    Mode {
        #[arg(value_enum)]
        mode: ModeArg,
    },
    /// Remove a proxy from the pool
    Remove {
        /// Proxy address (IP:PORT)
        address: String,
    },
    /// Export proxies to a file, one per line
    Export {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
        /// Only export proxies from this region
        #[arg(short, long)]
        region: Option<String>,
        /// Only export proxies at or below this latency (ms)
        #[arg(short = 'm', long)]
        max_latency: Option<f64>,
        /// Write IP:PORT instead of scheme://IP:PORT
        #[arg(long)]
        simple: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Keep the current proxy
    Fixed,
    /// Rotate on every request
    PerRequest,
}

impl From<ModeArg> for RotationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Fixed => RotationMode::Fixed,
            ModeArg::PerRequest => RotationMode::PerRequest,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, None | Some(Commands::Tui));
    init_tracing(cli.log_file.as_deref(), interactive)?;

    let config = DashboardConfig::load_or_default(cli.config.as_deref())?
        .with_overrides(cli.api_url, cli.timeout)?;

    let client = Arc::new(HttpPoolClient::new(
        &config.api_base_url,
        config.request_timeout(),
    )?);
    info!("Using pool API at {}", client.base_url());

    match cli.command {
        Some(Commands::Tui) | None => {
            // Default to TUI mode
            let dashboard = new_dashboard(client.clone(), &config);
            let mut app = DashboardApp::new(dashboard, client.base_url(), config.tick_rate());
            app.run().await?;
        }
        Some(Commands::List {
            region,
            max_latency,
        }) => {
            let filter = filter_from_args(region, max_latency);
            let mut query = ProxyQuery::all();
            if filter.region != ALL_REGIONS {
                query = query.with_region(filter.region.clone());
            }
            if let Some(max_ms) = filter.max_latency_ms {
                query = query.with_max_latency_ms(max_ms);
            }

            let snapshot = client.fetch_proxies(&query).await?;
            // The pool may ignore the query, so filter here as well
            let proxies = filter.apply(&snapshot.proxies);

            println!("Total: {} | Active: {}", snapshot.total, snapshot.active);
            print_table(&render_table(&proxies));
        }
        Some(Commands::Start {
            http_port,
            socks5_port,
        }) => {
            let config = config.clone().with_service_ports(
                http_port.unwrap_or(config.http_port),
                socks5_port.unwrap_or(config.socks5_port),
            );
            let mut dashboard = new_dashboard(client, &config);
            let ok = dashboard.start_service().await;
            finish(&dashboard, ok)?;
        }
        Some(Commands::Stop) => {
            let mut dashboard = new_dashboard(client, &config);
            let ok = dashboard.stop_service().await;
            finish(&dashboard, ok)?;
        }
        Some(Commands::Status) => {
            let all_query = ProxyQuery::all();
            let (status, snapshot) = futures::try_join!(
                client.server_status(),
                client.fetch_proxies(&all_query)
            )?;
            println!("{}", status.summary());
            println!("Total: {} | Active: {}", snapshot.total, snapshot.active);
            for (region, count) in &snapshot.regions {
                println!("  {} ({})", region, count);
            }
        }
        Some(Commands::Rotate) => {
            let mut dashboard = new_dashboard(client, &config);
            let ok = dashboard.rotate().await;
            finish(&dashboard, ok)?;
        }
        Some(Commands::Logs) => {
            let lines = client.fetch_logs().await?;
            if lines.is_empty() {
                println!("No pending log lines.");
            }
            for line in lines {
                println!("{}", line);
            }
        }
        Some(Commands::Fetch { no_scraping }) => {
            let mut dashboard = new_dashboard(client, &config);
            let request = FetchRequest {
                include_scraping: !no_scraping,
            };
            let ok = dashboard.trigger_fetch(request).await;
            finish(&dashboard, ok)?;
        }
        Some(Commands::Mode { mode }) => {
            let mut dashboard = new_dashboard(client, &config);
            let ok = dashboard.set_rotation_mode(mode.into()).await;
            finish(&dashboard, ok)?;
        }
        Some(Commands::Remove { address }) => {
            let mut dashboard = new_dashboard(client, &config);
            let ok = dashboard.remove_proxy(address).await;
            finish(&dashboard, ok)?;
        }
        Some(Commands::Export {
            output,
            region,
            max_latency,
            simple,
        }) => {
            let mut dashboard = new_dashboard(client, &config);
            if !dashboard.refresh().await {
                return Err(anyhow!("{}", dashboard.status().text));
            }
            dashboard.apply_filters(&filter_from_args(region, max_latency));

            let proxies = ProxyParser::from_records(&dashboard.state().displayed);
            ProxyParser::save_to_file(&proxies, &output, !simple)?;
            println!("Saved {} proxies to {:?}", proxies.len(), output);
        }
    }

    Ok(())
}

fn new_dashboard(client: Arc<HttpPoolClient>, config: &DashboardConfig) -> Dashboard {
    Dashboard::new(client)
        .with_service_ports(config.service_request())
        .with_log_capacity(config.log_capacity)
}

fn filter_from_args(region: Option<String>, max_latency: Option<f64>) -> FilterState {
    FilterState::new(
        region.unwrap_or_else(|| ALL_REGIONS.to_string()),
        max_latency.filter(|ms| *ms != 0.0),
    )
}

/// Print the outcome of a one-shot action and fail the process on error
fn finish(dashboard: &Dashboard, ok: bool) -> Result<()> {
    if ok {
        println!("{}", dashboard.status().text);
        Ok(())
    } else {
        Err(anyhow!("{}", dashboard.status().text))
    }
}

fn print_table(table: &TableView) {
    println!(
        "{:<22} {:<9} {:>11} {:>8} {:<12} {:<12} {:>6}",
        COLUMNS[0], COLUMNS[1], COLUMNS[2], COLUMNS[3], COLUMNS[4], COLUMNS[5], COLUMNS[6]
    );
    match table {
        TableView::Empty(text) => println!("{}", text),
        TableView::Rows(rows) => {
            for r in rows {
                println!(
                    "{:<22} {:<9} {:>11} {:>8} {:<12} {:<12} {:>6}",
                    r[0], r[1], r[2], r[3], r[4], r[5], r[6]
                );
            }
        }
    }
}

/// Logs go to `log_file` when given; otherwise to stderr, except in the
/// TUI where they would corrupt the screen.
fn init_tracing(log_file: Option<&Path>, interactive: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None if interactive => builder.with_writer(std::io::sink).init(),
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}
