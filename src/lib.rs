// src/lib.rs

//! Nile Catalog Library
//!
//! Loads the DPLA ancient Egypt collection through a caching fetcher and
//! serves it to a browsing session with facets and pagination.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
