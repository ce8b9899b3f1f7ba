// src/error.rs

//! Unified error handling for the catalog application.

use std::fmt;

use thiserror::Error;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed before a response arrived
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote endpoint answered with a non-success status
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Key-value backend refused an operation (quota, disabled storage)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The record count probe failed; callers fall back to a narrower query
    #[error("Failed to get record count: {0}")]
    CountQueryFailed(String),

    /// A single result page could not be fetched
    #[error("Failed to fetch page {page}: {message}")]
    PageFetchFailed { page: u32, message: String },

    /// Neither the primary nor the fallback query produced a dataset
    #[error("No data available from the catalog endpoint")]
    NoDataAvailable,
}

impl AppError {
    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Wrap any failure of the count probe.
    pub fn count_query(cause: impl fmt::Display) -> Self {
        Self::CountQueryFailed(cause.to_string())
    }

    /// Create a page fetch error for the given API page.
    pub fn page_fetch(page: u32, cause: impl fmt::Display) -> Self {
        Self::PageFetchFailed {
            page,
            message: cause.to_string(),
        }
    }
}
