//! Proxy data models

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Placeholder shown for fields the pool has not measured
pub const NOT_AVAILABLE: &str = "N/A";

/// Number of proxies per region label, ordered by label
pub type RegionCounts = BTreeMap<String, u64>;

/// Proxy type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    #[default]
    Http,
    Https,
    Socks4,
    Socks5,
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyType::Http => write!(f, "http"),
            ProxyType::Https => write!(f, "https"),
            ProxyType::Socks4 => write!(f, "socks4"),
            ProxyType::Socks5 => write!(f, "socks5"),
        }
    }
}

impl FromStr for ProxyType {
    type Err = anyhow::Error;

    /// Parse a protocol label as reported by the pool ("HTTP", "SOCKS5", ...)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(ProxyType::Http),
            "https" => Ok(ProxyType::Https),
            "socks4" => Ok(ProxyType::Socks4),
            "socks5" => Ok(ProxyType::Socks5),
            other => Err(anyhow::anyhow!(
                "Invalid proxy type: {}. Use: http, https, socks4, socks5",
                other
            )),
        }
    }
}

/// A parsed proxy endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxy {
    pub host: String,
    pub port: u16,
    pub proxy_type: ProxyType,
}

impl Proxy {
    pub fn new(host: String, port: u16, proxy_type: ProxyType) -> Self {
        Self {
            host,
            port,
            proxy_type,
        }
    }

    /// Get the proxy URL string
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.proxy_type, self.host, self.port)
    }

    /// Get the proxy string in IP:PORT format
    pub fn to_simple_string(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url())
    }
}

/// One proxy of the pool together with its measured properties.
///
/// Everything except the address and protocol may be missing; missing
/// values are displayed as [`NOT_AVAILABLE`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyRecord {
    /// Address in IP:PORT form
    pub proxy: String,
    /// Protocol label, e.g. "HTTP" or "SOCKS5"
    pub protocol: String,
    /// Round trip latency in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Anonymity level (Elite, Anonymous, Transparent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anonymity: Option<String>,
    /// Region label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consecutive_failures: Option<u32>,
}

impl ProxyRecord {
    pub fn new(proxy: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            proxy: proxy.into(),
            protocol: protocol.into(),
            latency: None,
            speed: None,
            anonymity: None,
            location: None,
            score: None,
            status: None,
            consecutive_failures: None,
        }
    }

    pub fn with_latency(mut self, latency: f64) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_anonymity(mut self, anonymity: impl Into<String>) -> Self {
        self.anonymity = Some(anonymity.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Latency converted to milliseconds
    pub fn latency_ms(&self) -> Option<f64> {
        self.latency.map(|secs| secs * 1000.0)
    }

    /// Region label, with empty labels treated as unknown
    pub fn region(&self) -> Option<&str> {
        self.location.as_deref().filter(|l| !l.is_empty())
    }

    /// Anonymity label, with empty labels treated as unknown
    pub fn anonymity_level(&self) -> Option<&str> {
        self.anonymity.as_deref().filter(|a| !a.is_empty())
    }
}

impl fmt::Display for ProxyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.proxy, self.protocol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_url() {
        let proxy = Proxy::new("127.0.0.1".to_string(), 8080, ProxyType::Http);
        assert_eq!(proxy.url(), "http://127.0.0.1:8080");

        let proxy = Proxy::new("192.168.1.1".to_string(), 1080, ProxyType::Socks5);
        assert_eq!(proxy.url(), "socks5://192.168.1.1:1080");
        assert_eq!(proxy.to_simple_string(), "192.168.1.1:1080");
    }

    #[test]
    fn test_proxy_type_from_label() {
        assert_eq!("HTTP".parse::<ProxyType>().unwrap(), ProxyType::Http);
        assert_eq!("SOCKS5".parse::<ProxyType>().unwrap(), ProxyType::Socks5);
        assert_eq!(" socks4 ".parse::<ProxyType>().unwrap(), ProxyType::Socks4);
        assert!("ftp".parse::<ProxyType>().is_err());
    }

    #[test]
    fn test_record_deserialize_partial() {
        let record: ProxyRecord =
            serde_json::from_str(r#"{"proxy":"10.0.0.1:1080","protocol":"SOCKS5"}"#).unwrap();
        assert_eq!(record.proxy, "10.0.0.1:1080");
        assert!(record.latency.is_none());
        assert!(record.score.is_none());
        assert!(record.region().is_none());
    }

    #[test]
    fn test_record_empty_labels_are_unknown() {
        let record = ProxyRecord::new("1.2.3.4:80", "HTTP")
            .with_location("")
            .with_anonymity("");
        assert!(record.region().is_none());
        assert!(record.anonymity_level().is_none());
    }

    #[test]
    fn test_latency_ms() {
        let record = ProxyRecord::new("1.2.3.4:80", "HTTP").with_latency(0.456);
        let ms = record.latency_ms().unwrap();
        assert!((ms - 456.0).abs() < 1e-9);
    }
}
