//! Session state owned by the dashboard controller

use crate::api::ProxySnapshot;
use crate::proxy::{ProxyRecord, RegionCounts};
use chrono::{DateTime, Local};
use std::collections::VecDeque;

/// Default number of activity log entries kept
pub const DEFAULT_LOG_CAPACITY: usize = 200;

/// Phase of the most recent operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusKind {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Status line shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Status {
    pub kind: StatusKind,
    pub text: String,
}

impl Status {
    pub fn loading(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Loading,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }
}

/// One timestamped activity log line
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub message: String,
    pub is_error: bool,
}

impl LogEntry {
    pub fn display(&self) -> String {
        format!("[{}] {}", self.at.format("%H:%M:%S"), self.message)
    }
}

/// Bounded activity log, oldest entries dropped first
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, message: impl Into<String>, is_error: bool) {
        self.entries.push_back(LogEntry {
            at: Local::now(),
            message: message.into(),
            is_error,
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LogEntry> {
        self.entries.iter()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

/// Data the dashboard currently knows about the pool
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    /// Last fetched list; filtering reads it but never changes it
    pub proxies: Vec<ProxyRecord>,
    pub regions: RegionCounts,
    /// Region labels in display order
    pub region_labels: Vec<String>,
    pub total: u64,
    pub active: u64,
    /// Records currently shown in the table
    pub displayed: Vec<ProxyRecord>,
}

impl DashboardState {
    /// Replace everything with a fresh snapshot and show it unfiltered
    pub fn replace(&mut self, snapshot: ProxySnapshot) {
        self.region_labels = snapshot.regions.keys().cloned().collect();
        self.displayed = snapshot.proxies.clone();
        self.proxies = snapshot.proxies;
        self.regions = snapshot.regions;
        self.total = snapshot.total;
        self.active = snapshot.active;
    }

    /// Forget a proxy the pool has dropped, keeping counters in step
    pub fn remove(&mut self, address: &str) -> Option<ProxyRecord> {
        let index = self.proxies.iter().position(|r| r.proxy == address)?;
        let record = self.proxies.remove(index);
        self.displayed.retain(|r| r.proxy != address);
        self.active = self.active.saturating_sub(1);

        if let Some(region) = record.region() {
            if let Some(count) = self.regions.get_mut(region) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    self.regions.remove(region);
                    self.region_labels.retain(|label| label != region);
                }
            }
        }
        Some(record)
    }
}
