//! Client side of the proxy pool API
//!
//! The dashboard talks to the pool only through [`PoolClient`], so the
//! HTTP implementation can be swapped for a fake in tests.

pub mod http;
pub mod models;

pub use http::HttpPoolClient;
pub use models::{
    ApiResponse, FetchRequest, ProxyQuery, ProxySnapshot, RotationMode, RotationModeRequest,
    ServerStatus, StartServiceRequest,
};

use crate::proxy::ProxyRecord;
use crate::Result;
use async_trait::async_trait;

/// Operations offered by a proxy pool service
#[async_trait]
pub trait PoolClient: Send + Sync {
    /// Fetch the proxies matching `query` plus the pool's aggregate counts
    async fn fetch_proxies(&self, query: &ProxyQuery) -> Result<ProxySnapshot>;

    /// Ask the pool to start its local proxy service, returning its message
    async fn start_service(&self, request: &StartServiceRequest) -> Result<String>;

    /// Ask the pool to stop its local proxy service, returning its message
    async fn stop_service(&self) -> Result<String>;

    async fn server_status(&self) -> Result<ServerStatus>;

    /// Rotate to the next proxy; `None` when the pool has nothing usable
    async fn rotate(&self) -> Result<Option<ProxyRecord>>;

    /// Drain the pool's pending log lines
    async fn fetch_logs(&self) -> Result<Vec<String>>;

    /// Start a background fetch and validation run on the pool.
    ///
    /// Returns as soon as the run is queued; progress shows up in the logs.
    async fn trigger_fetch(&self, request: &FetchRequest) -> Result<String>;

    async fn set_rotation_mode(&self, mode: RotationMode) -> Result<String>;

    /// Drop one proxy from the pool by its address
    async fn remove_proxy(&self, address: &str) -> Result<String>;
}
