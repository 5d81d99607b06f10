//! Proxy module for the pool's data model
//!
//! This module provides:
//! - The proxy record reported by the pool and its region counts
//! - Parsing record addresses into endpoints
//! - Exporting endpoints to files

pub mod models;
pub mod parser;

pub use models::{Proxy, ProxyRecord, ProxyType, RegionCounts, NOT_AVAILABLE};
pub use parser::ProxyParser;
