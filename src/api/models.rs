//! Wire models of the proxy pool API

use crate::proxy::{ProxyRecord, RegionCounts};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Envelope wrapping every response of the pool API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Turn a rejected envelope into an error, keeping the backend message
    pub fn into_result(self) -> crate::Result<(String, Option<T>)> {
        if self.success {
            Ok((self.message, self.data))
        } else if self.message.is_empty() {
            Err(anyhow!("request rejected by the pool"))
        } else {
            Err(anyhow!("request rejected by the pool: {}", self.message))
        }
    }

    /// Like [`ApiResponse::into_result`] but requires a payload
    pub fn into_data(self) -> crate::Result<T> {
        let (message, data) = self.into_result()?;
        data.ok_or_else(|| anyhow!("response carried no data ({})", message))
    }
}

/// Full state of the pool as needed by one refresh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProxySnapshot {
    #[serde(default)]
    pub proxies: Vec<ProxyRecord>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub active: u64,
    #[serde(default)]
    pub regions: RegionCounts,
}

/// Server-side filter for a proxy list query
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProxyQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_latency_ms: Option<f64>,
}

impl ProxyQuery {
    /// Query for the whole pool
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_max_latency_ms(mut self, max_latency_ms: f64) -> Self {
        self.max_latency_ms = Some(max_latency_ms);
        self
    }
}

/// Body of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartServiceRequest {
    pub http_port: u16,
    pub socks5_port: u16,
}

impl Default for StartServiceRequest {
    fn default() -> Self {
        Self {
            http_port: 8080,
            socks5_port: 1080,
        }
    }
}

/// Body of a fetch request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Also scrape proxy listing sites, not only the plain-text sources
    pub include_scraping: bool,
}

impl Default for FetchRequest {
    fn default() -> Self {
        Self {
            include_scraping: true,
        }
    }
}

/// Body of a rotation mode change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationModeRequest {
    pub per_request: bool,
}

impl From<RotationMode> for RotationModeRequest {
    fn from(mode: RotationMode) -> Self {
        Self {
            per_request: mode == RotationMode::PerRequest,
        }
    }
}

/// How the pool picks the upstream proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RotationMode {
    #[default]
    Fixed,
    PerRequest,
}

impl RotationMode {
    /// The other mode
    pub fn toggled(self) -> Self {
        match self {
            RotationMode::Fixed => RotationMode::PerRequest,
            RotationMode::PerRequest => RotationMode::Fixed,
        }
    }
}

impl fmt::Display for RotationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RotationMode::Fixed => write!(f, "fixed"),
            RotationMode::PerRequest => write!(f, "per request"),
        }
    }
}

/// Running state of the pool's local proxy service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub http_running: bool,
    #[serde(default)]
    pub http_port: u16,
    pub socks5_running: bool,
    #[serde(default)]
    pub socks5_port: u16,
    #[serde(default)]
    pub current_proxy: Option<ProxyRecord>,
    #[serde(default)]
    pub rotation_mode: RotationMode,
}

impl ServerStatus {
    pub fn is_running(&self) -> bool {
        self.http_running || self.socks5_running
    }

    /// One line summary for the status bar
    pub fn summary(&self) -> String {
        if !self.is_running() {
            return "Service is not running.".to_string();
        }
        let current = self
            .current_proxy
            .as_ref()
            .map_or_else(|| "none".to_string(), |p| p.proxy.clone());
        format!(
            "Service running. HTTP: {} | SOCKS5: {} | rotation: {} | current proxy: {}",
            self.http_port, self.socks5_port, self.rotation_mode, current
        )
    }
}
