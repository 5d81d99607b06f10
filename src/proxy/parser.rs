//! Endpoint parsing and export for pool records

use crate::proxy::models::{Proxy, ProxyRecord, ProxyType};
use crate::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Matches `host:port` with an optional `scheme://` prefix
static ADDRESS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(https?|socks[45])://)?([^:/\s@]+):(\d{1,5})/?$")
        .expect("Invalid address regex")
});

/// Parser turning pool addresses into endpoints
pub struct ProxyParser;

impl ProxyParser {
    /// Parse a single address
    ///
    /// Supports formats:
    /// - IP:PORT
    /// - scheme://IP:PORT
    pub fn parse_address(address: &str, default_type: ProxyType) -> Option<Proxy> {
        let caps = ADDRESS_REGEX.captures(address.trim())?;

        let proxy_type = match caps.get(1) {
            Some(scheme) => scheme.as_str().parse().ok()?,
            None => default_type,
        };
        let host = caps[2].to_string();
        let port: u16 = caps[3].parse().ok()?;

        Some(Proxy::new(host, port, proxy_type))
    }

    /// Build an endpoint from a record, using its protocol label as the type
    pub fn from_record(record: &ProxyRecord) -> Option<Proxy> {
        let proxy_type = record.protocol.parse().unwrap_or_default();
        Self::parse_address(&record.proxy, proxy_type)
    }

    /// Convert records, skipping any whose address cannot be parsed
    pub fn from_records(records: &[ProxyRecord]) -> Vec<Proxy> {
        records.iter().filter_map(Self::from_record).collect()
    }

    /// Save proxies to a file, one per line
    pub fn save_to_file<P: AsRef<Path>>(proxies: &[Proxy], path: P, as_url: bool) -> Result<()> {
        let content: String = proxies
            .iter()
            .map(|p| if as_url { p.url() } else { p.to_simple_string() })
            .collect::<Vec<_>>()
            .join("\n");

        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_address() {
        let proxy = ProxyParser::parse_address("192.168.1.1:8080", ProxyType::Http).unwrap();
        assert_eq!(proxy.host, "192.168.1.1");
        assert_eq!(proxy.port, 8080);
        assert_eq!(proxy.proxy_type, ProxyType::Http);
    }

    #[test]
    fn test_parse_url_address() {
        let proxy = ProxyParser::parse_address("socks5://10.0.0.1:1080", ProxyType::Http).unwrap();
        assert_eq!(proxy.host, "10.0.0.1");
        assert_eq!(proxy.port, 1080);
        assert_eq!(proxy.proxy_type, ProxyType::Socks5);
    }

    #[test]
    fn test_parse_invalid_address() {
        assert!(ProxyParser::parse_address("", ProxyType::Http).is_none());
        assert!(ProxyParser::parse_address("192.168.1.1", ProxyType::Http).is_none());
        assert!(ProxyParser::parse_address("192.168.1.1:abc", ProxyType::Http).is_none());
        assert!(ProxyParser::parse_address("192.168.1.1:99999", ProxyType::Http).is_none());
    }

    #[test]
    fn test_from_record_uses_protocol_label() {
        let record = ProxyRecord::new("10.0.0.1:1080", "SOCKS5");
        let proxy = ProxyParser::from_record(&record).unwrap();
        assert_eq!(proxy.url(), "socks5://10.0.0.1:1080");

        // Unknown labels fall back to http
        let record = ProxyRecord::new("10.0.0.2:8080", "weird");
        let proxy = ProxyParser::from_record(&record).unwrap();
        assert_eq!(proxy.proxy_type, ProxyType::Http);
    }

    #[test]
    fn test_from_records_skips_bad_addresses() {
        let records = vec![
            ProxyRecord::new("10.0.0.1:1080", "SOCKS5"),
            ProxyRecord::new("not-an-address", "HTTP"),
        ];
        assert_eq!(ProxyParser::from_records(&records).len(), 1);
    }

    #[test]
    fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxies.txt");
        let proxies = vec![
            Proxy::new("10.0.0.1".to_string(), 1080, ProxyType::Socks5),
            Proxy::new("10.0.0.2".to_string(), 8080, ProxyType::Http),
        ];

        ProxyParser::save_to_file(&proxies, &path, true).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "socks5://10.0.0.1:1080\nhttp://10.0.0.2:8080");

        ProxyParser::save_to_file(&proxies, &path, false).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "10.0.0.1:1080\n10.0.0.2:8080");
    }
}
