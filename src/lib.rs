//! Proxy Dashboard - terminal front-end for a proxy pool service
//!
//! Fetches the pool's proxies, filters them by region and latency,
//! renders them as a table and controls the pool's local proxy service.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod proxy;
pub mod tui;

pub use api::{HttpPoolClient, PoolClient};
pub use config::DashboardConfig;
pub use dashboard::{Dashboard, FilterState};
pub use proxy::*;

/// Application result type
pub type Result<T> = anyhow::Result<T>;
