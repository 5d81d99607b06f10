//! Configuration for the dashboard

use crate::api::http::{DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::api::StartServiceRequest;
use crate::dashboard::state::DEFAULT_LOG_CAPACITY;
use crate::Result;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Default redraw interval of the TUI in milliseconds
const DEFAULT_TICK_RATE_MS: u64 = 100;

/// Dashboard configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Base URL of the pool API
    pub api_base_url: String,
    /// Timeout for each API request, in seconds
    pub request_timeout_secs: u64,
    /// HTTP port requested when starting the service
    pub http_port: u16,
    /// SOCKS5 port requested when starting the service
    pub socks5_port: u16,
    /// TUI redraw interval in milliseconds
    pub tick_rate_ms: u64,
    /// Number of activity log entries kept
    pub log_capacity: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        let service = StartServiceRequest::default();
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            http_port: service.http_port,
            socks5_port: service.socks5_port,
            tick_rate_ms: DEFAULT_TICK_RATE_MS,
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

impl DashboardConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// `<config dir>/proxy-dashboard/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("proxy-dashboard")
            .join("config.toml")
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {:?}", path))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("invalid config {:?}", path))?;
        config
            .validate()
            .with_context(|| format!("invalid config {:?}", path))?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Reject values the dashboard cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            bail!("request timeout must be at least 1 second");
        }
        Ok(())
    }

    /// Apply command line flags on top of the loaded values
    pub fn with_overrides(mut self, api_url: Option<String>, timeout_secs: Option<u64>) -> Result<Self> {
        if let Some(url) = api_url {
            self = self.with_api_base_url(url);
        }
        if let Some(secs) = timeout_secs {
            self = self.with_request_timeout(Duration::from_secs(secs));
        }
        self.validate()?;
        Ok(self)
    }

    /// Load `path` if given, else the default file if it exists, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Self::default_path();
                if default_path.exists() {
                    Self::load(&default_path)
                } else {
                    debug!("No config at {:?}, using defaults", default_path);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn with_api_base_url(mut self, url: String) -> Self {
        self.api_base_url = url;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_service_ports(mut self, http_port: u16, socks5_port: u16) -> Self {
        self.http_port = http_port;
        self.socks5_port = socks5_port;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }

    pub fn service_request(&self) -> StartServiceRequest {
        StartServiceRequest {
            http_port: self.http_port,
            socks5_port: self.socks5_port,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = DashboardConfig::default();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.service_request(), StartServiceRequest::default());
        assert_eq!(config.tick_rate(), Duration::from_millis(100));
        assert_eq!(config.log_capacity, 200);
    }

    #[test]
    fn test_config_builder() {
        let config = DashboardConfig::new()
            .with_api_base_url("http://pool:9000/api".to_string())
            .with_request_timeout(Duration::from_secs(3))
            .with_service_ports(8888, 1081);

        assert_eq!(config.api_base_url, "http://pool:9000/api");
        assert_eq!(config.request_timeout_secs, 3);
        assert_eq!(config.http_port, 8888);
        assert_eq!(config.socks5_port, 1081);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_base_url = \"http://10.0.0.5:5000/api\"\nhttp_port = 8888\n").unwrap();

        let config = DashboardConfig::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.api_base_url, "http://10.0.0.5:5000/api");
        assert_eq!(config.http_port, 8888);
        assert_eq!(config.socks5_port, 1080);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "api_base_url = \"http://10.0.0.5:5000/api\"\nrequest_timeout_secs = 30\nhttp_port = 8888\n",
        )
        .unwrap();

        let config = DashboardConfig::load_or_default(Some(&path))
            .unwrap()
            .with_overrides(Some("http://pool:9000/api".to_string()), Some(5))
            .unwrap();
        assert_eq!(config.api_base_url, "http://pool:9000/api");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        // values without a flag keep the file's setting
        assert_eq!(config.http_port, 8888);

        let untouched = DashboardConfig::load(&path).unwrap().with_overrides(None, None).unwrap();
        assert_eq!(untouched.api_base_url, "http://10.0.0.5:5000/api");
        assert_eq!(untouched.request_timeout_secs, 30);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        assert!(DashboardConfig::default().with_overrides(None, Some(0)).is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "request_timeout_secs = 0\n").unwrap();
        assert!(DashboardConfig::load(&path).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = DashboardConfig::new().with_service_ports(9000, 9001);

        config.save(&path).unwrap();
        assert_eq!(DashboardConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(DashboardConfig::load_or_default(Some(&path)).is_err());
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "http_port = \"not a port\"").unwrap();
        assert!(DashboardConfig::load(&path).is_err());
    }
}
