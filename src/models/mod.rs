// src/models/mod.rs

//! Domain models for the catalog application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod criteria;
mod record;

// Re-export all public types
pub use config::{ApiConfig, BatchConfig, CacheConfig, Config, ViewConfig};
pub use criteria::{DateRange, DateRangeKey, FilterCriteria, ViewMode};
pub use record::{ITEM_BASE_URL, Provider, Record, SourceResource};

use serde::{Deserialize, Serialize};

/// Body of a successful search response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Total matches for the query, independent of paging
    #[serde(default)]
    pub count: u64,

    /// Records on the requested page
    #[serde(default)]
    pub docs: Vec<Record>,
}

/// Distinct facet values present in a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetOptions {
    pub types: Vec<String>,
    pub institutions: Vec<String>,
}
