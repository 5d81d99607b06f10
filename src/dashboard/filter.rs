//! Client-side filtering of the held proxy list

use crate::proxy::ProxyRecord;

/// Region value meaning "do not filter by region"
pub const ALL_REGIONS: &str = "All";

/// Filter read from the dashboard controls
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    /// Selected region, or [`ALL_REGIONS`]
    pub region: String,
    /// Upper latency bound in milliseconds
    pub max_latency_ms: Option<f64>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            region: ALL_REGIONS.to_string(),
            max_latency_ms: None,
        }
    }
}

impl FilterState {
    pub fn new(region: impl Into<String>, max_latency_ms: Option<f64>) -> Self {
        Self {
            region: region.into(),
            max_latency_ms,
        }
    }

    /// Build a filter from the raw control values
    pub fn from_controls(region: &str, max_latency_text: &str) -> Self {
        Self::new(region, parse_max_latency(max_latency_text))
    }

    pub fn is_unfiltered(&self) -> bool {
        self.region == ALL_REGIONS && self.max_latency_ms.is_none()
    }

    /// Whether a single record passes the filter
    pub fn matches(&self, record: &ProxyRecord) -> bool {
        if self.region != ALL_REGIONS && record.location.as_deref() != Some(self.region.as_str()) {
            return false;
        }
        match self.max_latency_ms {
            Some(max_ms) => record.latency_ms().is_some_and(|ms| ms <= max_ms),
            None => true,
        }
    }

    /// Derive the filtered view of `records` without touching them
    pub fn apply(&self, records: &[ProxyRecord]) -> Vec<ProxyRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

/// Read the max latency input.
///
/// Takes the longest numeric prefix of the text. Empty, unparseable and
/// zero inputs all mean "no bound".
pub fn parse_max_latency(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let value = (1..=text.len())
        .rev()
        .filter(|&end| text.is_char_boundary(end))
        .find_map(|end| {
            let prefix = &text[..end];
            // Rust accepts "inf"/"nan" spellings the input box never should
            if prefix.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
                return None;
            }
            prefix.parse::<f64>().ok()
        })?;

    if value == 0.0 || value.is_nan() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Vec<ProxyRecord> {
        vec![
            ProxyRecord::new("192.168.1.1:8080", "HTTP")
                .with_latency(0.123)
                .with_location("中国"),
            ProxyRecord::new("10.0.0.1:1080", "SOCKS5")
                .with_latency(0.456)
                .with_location("美国"),
            ProxyRecord::new("172.16.0.1:80", "HTTP")
                .with_latency(1.234)
                .with_location("德国"),
        ]
    }

    #[test]
    fn test_default_filter_keeps_everything() {
        let filter = FilterState::default();
        assert!(filter.is_unfiltered());
        assert_eq!(filter.apply(&fixture()).len(), 3);
    }

    #[test]
    fn test_region_filter() {
        let filtered = FilterState::new("美国", None).apply(&fixture());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].proxy, "10.0.0.1:1080");
    }

    #[test]
    fn test_region_filter_skips_unknown_location() {
        let records = vec![ProxyRecord::new("1.1.1.1:80", "HTTP")];
        assert!(FilterState::new("美国", None).apply(&records).is_empty());
    }

    #[test]
    fn test_latency_filter_converts_seconds() {
        let filtered = FilterState::new(ALL_REGIONS, Some(500.0)).apply(&fixture());
        let addresses: Vec<_> = filtered.iter().map(|r| r.proxy.as_str()).collect();
        assert_eq!(addresses, vec!["192.168.1.1:8080", "10.0.0.1:1080"]);
    }

    #[test]
    fn test_latency_filter_is_inclusive() {
        let records = vec![ProxyRecord::new("1.1.1.1:80", "HTTP").with_latency(0.5)];
        assert_eq!(FilterState::new(ALL_REGIONS, Some(500.0)).apply(&records).len(), 1);
    }

    #[test]
    fn test_latency_filter_drops_unmeasured() {
        let records = vec![ProxyRecord::new("1.1.1.1:80", "HTTP")];
        assert!(FilterState::new(ALL_REGIONS, Some(10_000.0)).apply(&records).is_empty());
    }

    #[test]
    fn test_combined_filter() {
        let filtered = FilterState::new("德国", Some(500.0)).apply(&fixture());
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_apply_does_not_mutate_source() {
        let records = fixture();
        let _ = FilterState::new("美国", Some(100.0)).apply(&records);
        assert_eq!(records, fixture());
    }

    #[test]
    fn test_parse_max_latency() {
        assert_eq!(parse_max_latency("500"), Some(500.0));
        assert_eq!(parse_max_latency(" 250.5"), Some(250.5));
        assert_eq!(parse_max_latency("500ms"), Some(500.0));
        assert_eq!(parse_max_latency("-5"), Some(-5.0));
        assert_eq!(parse_max_latency(""), None);
        assert_eq!(parse_max_latency("abc"), None);
        assert_eq!(parse_max_latency("0"), None);
        assert_eq!(parse_max_latency("inf"), None);
    }

    #[test]
    fn test_from_controls() {
        let filter = FilterState::from_controls("美国", "300");
        assert_eq!(filter.region, "美国");
        assert_eq!(filter.max_latency_ms, Some(300.0));
    }
}
