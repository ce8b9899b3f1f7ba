// src/services/mod.rs

//! Remote data acquisition services.
//!
//! Provides the search endpoint client, the capped full-dataset fetcher and
//! the progressive batch loader built on top of it.

pub mod batch;
pub mod client;
pub mod fetcher;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{BatchLoader, BatchState, BatchTicket};
pub use client::{ProxyClient, SearchBackend, SearchQuery};
pub use fetcher::{FetchOutcome, Fetcher, Origin, PageBatch, PageFetcher, PageReport};
