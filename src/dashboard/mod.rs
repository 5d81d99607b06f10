//! Dashboard controller
//!
//! [`Dashboard`] owns the session state (held proxy list, regions,
//! counters, displayed rows) and turns user actions into calls on a
//! [`PoolClient`]. Every action follows the same shape: the status goes to
//! loading when the action is issued, then to success or error when its
//! outcome is applied. Failures never escape an action; they become an
//! error status and leave the previously shown data in place.
//!
//! Actions can be driven in two ways:
//! - `dashboard.refresh().await` and friends, which issue and apply in one
//!   step, used by the one-shot CLI commands and tests
//! - [`Dashboard::dispatch`] + [`Dashboard::complete`], which let the TUI
//!   run the request on a background task while it keeps drawing

pub mod filter;
pub mod state;
pub mod view;

pub use filter::{FilterState, ALL_REGIONS};
pub use state::{ActivityLog, DashboardState, LogEntry, Status, StatusKind};
pub use view::{render, DashboardView, RegionOption, TableView};

use crate::api::{
    FetchRequest, PoolClient, ProxyQuery, ProxySnapshot, RotationMode, ServerStatus,
    StartServiceRequest,
};
use crate::proxy::ProxyRecord;
use crate::Result;
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use tracing::{debug, error, info};

/// An action that needs the pool service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Refresh,
    StartService,
    StopService,
    ServerStatus,
    Rotate,
    FetchLogs,
    /// Have the pool fetch and validate new proxies
    FetchPool(FetchRequest),
    SetRotationMode(RotationMode),
    /// Drop the proxy with this address from the pool
    RemoveProxy(String),
}

impl Operation {
    fn loading_text(&self) -> &'static str {
        match self {
            Operation::Refresh => "Refreshing proxies...",
            Operation::StartService => "Starting service...",
            Operation::StopService => "Stopping service...",
            Operation::ServerStatus => "Querying service status...",
            Operation::Rotate => "Rotating proxy...",
            Operation::FetchLogs => "Fetching pool logs...",
            Operation::FetchPool(_) => "Starting proxy fetch...",
            Operation::SetRotationMode(_) => "Setting rotation mode...",
            Operation::RemoveProxy(_) => "Removing proxy...",
        }
    }

    fn failure_text(&self) -> &'static str {
        match self {
            Operation::Refresh => "Failed to refresh proxies.",
            Operation::StartService => "Failed to start service.",
            Operation::StopService => "Failed to stop service.",
            Operation::ServerStatus => "Failed to query service status.",
            Operation::Rotate => "Failed to rotate proxy.",
            Operation::FetchLogs => "Failed to fetch pool logs.",
            Operation::FetchPool(_) => "Failed to start proxy fetch.",
            Operation::SetRotationMode(_) => "Failed to set rotation mode.",
            Operation::RemoveProxy(_) => "Failed to remove proxy.",
        }
    }
}

/// Handle for an issued operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub operation: Operation,
    seq: u64,
}

/// Result of an operation, ready to be applied to the dashboard
#[derive(Debug)]
pub enum Outcome {
    Refreshed(Result<ProxySnapshot>),
    Started(Result<String>),
    Stopped(Result<String>),
    Status(Result<ServerStatus>),
    Rotated(Result<Option<ProxyRecord>>),
    Logs(Result<Vec<String>>),
    FetchStarted(Result<String>),
    RotationModeSet(Result<String>),
    Removed(Result<String>),
}

/// Dashboard controller
pub struct Dashboard {
    client: Arc<dyn PoolClient>,
    service: StartServiceRequest,
    state: DashboardState,
    status: Status,
    log: ActivityLog,
    /// Last rotation mode reported by or set on the pool
    rotation_mode: RotationMode,
    next_seq: u64,
    latest_refresh: u64,
}

impl Dashboard {
    pub fn new(client: Arc<dyn PoolClient>) -> Self {
        Self {
            client,
            service: StartServiceRequest::default(),
            state: DashboardState::default(),
            status: Status::loading("Loading..."),
            log: ActivityLog::default(),
            rotation_mode: RotationMode::default(),
            next_seq: 0,
            latest_refresh: 0,
        }
    }

    /// Ports requested when starting the service
    pub fn with_service_ports(mut self, service: StartServiceRequest) -> Self {
        self.service = service;
        self
    }

    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log = ActivityLog::new(capacity);
        self
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    pub fn rotation_mode(&self) -> RotationMode {
        self.rotation_mode
    }

    pub fn view(&self) -> DashboardView {
        render(self)
    }

    fn set_status(&mut self, status: Status) {
        self.log.push(status.text.clone(), status.is_error());
        self.status = status;
    }

    fn fail(&mut self, operation: &Operation, err: &anyhow::Error) {
        let text = operation.failure_text();
        error!("{} {:#}", text, err);
        self.log.push(format!("{:#}", err), true);
        self.set_status(Status::error(text));
    }

    /// Issue `operation` and return the request to run for it.
    ///
    /// The returned future owns everything it needs, so it can be spawned.
    pub fn dispatch(&mut self, operation: Operation) -> (Ticket, BoxFuture<'static, Outcome>) {
        self.next_seq += 1;
        let ticket = Ticket {
            operation: operation.clone(),
            seq: self.next_seq,
        };
        if operation == Operation::Refresh {
            self.latest_refresh = ticket.seq;
        }
        debug!(?operation, seq = ticket.seq, "dispatching");
        self.set_status(Status::loading(operation.loading_text()));

        let client = Arc::clone(&self.client);
        let service = self.service;
        let request = async move {
            match operation {
                Operation::Refresh => Outcome::Refreshed(client.fetch_proxies(&ProxyQuery::all()).await),
                Operation::StartService => Outcome::Started(client.start_service(&service).await),
                Operation::StopService => Outcome::Stopped(client.stop_service().await),
                Operation::ServerStatus => Outcome::Status(client.server_status().await),
                Operation::Rotate => Outcome::Rotated(client.rotate().await),
                Operation::FetchLogs => Outcome::Logs(client.fetch_logs().await),
                Operation::FetchPool(request) => {
                    Outcome::FetchStarted(client.trigger_fetch(&request).await)
                }
                Operation::SetRotationMode(mode) => {
                    Outcome::RotationModeSet(client.set_rotation_mode(mode).await)
                }
                Operation::RemoveProxy(address) => {
                    Outcome::Removed(client.remove_proxy(&address).await)
                }
            }
        }
        .boxed();

        (ticket, request)
    }

    /// Apply the outcome of an issued operation.
    ///
    /// Returns false when the outcome was dropped because a newer refresh
    /// had already been issued.
    pub fn complete(&mut self, ticket: Ticket, outcome: Outcome) -> bool {
        if ticket.operation == Operation::Refresh && ticket.seq < self.latest_refresh {
            debug!(seq = ticket.seq, latest = self.latest_refresh, "dropping stale refresh");
            return false;
        }

        match outcome {
            Outcome::Refreshed(Ok(snapshot)) => {
                info!(
                    proxies = snapshot.proxies.len(),
                    total = snapshot.total,
                    active = snapshot.active,
                    "proxies refreshed"
                );
                self.state.replace(snapshot);
                self.set_status(Status::success("Proxies refreshed."));
            }
            Outcome::Started(Ok(message)) => {
                info!("service start requested: {}", message);
                self.push_backend_message(message);
                self.set_status(Status::success("Service started."));
            }
            Outcome::Stopped(Ok(message)) => {
                info!("service stop requested: {}", message);
                self.push_backend_message(message);
                self.set_status(Status::success("Service stopped."));
            }
            Outcome::Status(Ok(status)) => {
                if status.is_running() {
                    self.rotation_mode = status.rotation_mode;
                }
                self.set_status(Status::success(status.summary()));
            }
            Outcome::Rotated(Ok(Some(proxy))) => {
                self.set_status(Status::success(format!("Rotated to proxy: {}", proxy)));
            }
            Outcome::Rotated(Ok(None)) => {
                self.set_status(Status::success("No proxy available."));
            }
            Outcome::Logs(Ok(lines)) => {
                let count = lines.len();
                for line in lines {
                    self.log.push(line, false);
                }
                self.set_status(Status::success(format!("Fetched {} log lines.", count)));
            }
            Outcome::FetchStarted(Ok(message)) => {
                info!("proxy fetch requested: {}", message);
                self.push_backend_message(message);
                self.set_status(Status::success("Proxy fetch started. Press l for progress."));
            }
            Outcome::RotationModeSet(Ok(message)) => {
                if let Operation::SetRotationMode(mode) = ticket.operation {
                    self.rotation_mode = mode;
                }
                self.push_backend_message(message);
                self.set_status(Status::success(format!(
                    "Rotation mode set to {}.",
                    self.rotation_mode
                )));
            }
            Outcome::Removed(Ok(message)) => {
                if let Operation::RemoveProxy(address) = &ticket.operation {
                    self.state.remove(address);
                    info!(%address, "proxy removed");
                    self.push_backend_message(message);
                    self.set_status(Status::success(format!("Removed proxy {}.", address)));
                }
            }
            Outcome::Refreshed(Err(e))
            | Outcome::Started(Err(e))
            | Outcome::Stopped(Err(e))
            | Outcome::Status(Err(e))
            | Outcome::Rotated(Err(e))
            | Outcome::Logs(Err(e))
            | Outcome::FetchStarted(Err(e))
            | Outcome::RotationModeSet(Err(e))
            | Outcome::Removed(Err(e)) => self.fail(&ticket.operation, &e),
        }
        true
    }

    fn push_backend_message(&mut self, message: String) {
        if !message.is_empty() {
            self.log.push(message, false);
        }
    }

    /// Issue an operation, wait for it and apply its outcome
    pub async fn run(&mut self, operation: Operation) -> bool {
        let (ticket, request) = self.dispatch(operation);
        let outcome = request.await;
        self.complete(ticket, outcome);
        !self.status.is_error()
    }

    /// Fetch the whole pool and show it unfiltered; returns false on failure
    pub async fn refresh(&mut self) -> bool {
        self.run(Operation::Refresh).await
    }

    pub async fn start_service(&mut self) -> bool {
        self.run(Operation::StartService).await
    }

    pub async fn stop_service(&mut self) -> bool {
        self.run(Operation::StopService).await
    }

    pub async fn server_status(&mut self) -> bool {
        self.run(Operation::ServerStatus).await
    }

    pub async fn rotate(&mut self) -> bool {
        self.run(Operation::Rotate).await
    }

    pub async fn fetch_logs(&mut self) -> bool {
        self.run(Operation::FetchLogs).await
    }

    pub async fn trigger_fetch(&mut self, request: FetchRequest) -> bool {
        self.run(Operation::FetchPool(request)).await
    }

    pub async fn set_rotation_mode(&mut self, mode: RotationMode) -> bool {
        self.run(Operation::SetRotationMode(mode)).await
    }

    pub async fn remove_proxy(&mut self, address: impl Into<String>) -> bool {
        self.run(Operation::RemoveProxy(address.into())).await
    }

    /// Filter the held list and show the result. Never calls the pool.
    pub fn apply_filters(&mut self, filter: &FilterState) {
        self.set_status(Status::loading("Applying filters..."));
        self.state.displayed = filter.apply(&self.state.proxies);
        debug!(
            region = %filter.region,
            max_latency_ms = ?filter.max_latency_ms,
            shown = self.state.displayed.len(),
            "filters applied"
        );
        self.set_status(Status::success("Filters applied."));
    }
}
