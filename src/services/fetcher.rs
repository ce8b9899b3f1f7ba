// src/services/fetcher.rs

//! Remote dataset fetcher.
//!
//! Produces the working record set for a session, preferring the cache:
//! count probe, then ascending page requests up to a hard cap, with a narrow
//! fallback query when the probe fails. A failing page is skipped and
//! counted; only a load where every page failed is treated as no data.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::error::{AppError, Result};
use crate::models::{ApiConfig, Config, Record};
use crate::services::{SearchBackend, SearchQuery};
use crate::storage::CacheStore;

/// Where a loaded dataset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cache,
    Remote,
    /// The count probe failed and the narrow fallback query answered
    Fallback,
}

/// Per-page bookkeeping for one multi-page load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageReport {
    pub requested: usize,
    /// API page numbers that failed, ascending
    pub failed: Vec<u32>,
}

impl PageReport {
    pub fn succeeded(&self) -> usize {
        self.requested - self.failed.len()
    }

    pub fn all_failed(&self) -> bool {
        self.requested > 0 && self.failed.len() == self.requested
    }
}

/// Records gathered from a run of pages, in page order.
#[derive(Debug, Clone, Default)]
pub struct PageBatch {
    pub records: Vec<Record>,
    pub report: PageReport,
}

/// Result of [`Fetcher::fetch_all`].
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub records: Vec<Record>,
    pub origin: Origin,
    /// Matches reported by the endpoint (record count for cache/fallback)
    pub total_available: u64,
    pub pages: PageReport,
    /// Why the primary query was abandoned, for fallback loads
    pub count_error: Option<String>,
}

impl FetchOutcome {
    fn cached(records: Vec<Record>) -> Self {
        Self {
            total_available: records.len() as u64,
            records,
            origin: Origin::Cache,
            pages: PageReport::default(),
            count_error: None,
        }
    }
}

/// Sequential page retrieval for one search expression.
#[derive(Clone)]
pub struct PageFetcher {
    backend: Arc<dyn SearchBackend>,
    expression: String,
    page_size: u32,
    delay: Duration,
}

impl PageFetcher {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        expression: impl Into<String>,
        page_size: u32,
        delay: Duration,
    ) -> Self {
        Self {
            backend,
            expression: expression.into(),
            page_size,
            delay,
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Total matches for the expression.
    pub async fn count(&self) -> Result<u64> {
        log::info!("Fetching record count for query: {}", self.expression);
        let response = self
            .backend
            .search(&SearchQuery::count(&self.expression))
            .await
            .map_err(AppError::count_query)?;
        log::info!("Total records available: {}", response.count);
        Ok(response.count)
    }

    /// Fetch a single API page.
    pub async fn fetch_page(&self, page: u32) -> Result<Vec<Record>> {
        let query = SearchQuery::page(&self.expression, self.page_size, page);
        let response = self
            .backend
            .search(&query)
            .await
            .map_err(|e| AppError::page_fetch(page, e))?;
        Ok(response.docs)
    }

    /// Fetch `pages` in ascending order, pausing between requests.
    pub async fn fetch_pages(&self, pages: RangeInclusive<u32>) -> PageBatch {
        let last = *pages.end();
        let results: Vec<(u32, Result<Vec<Record>>)> = stream::iter(pages.enumerate())
            .then(|(i, page)| async move {
                if i > 0 && !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                log::debug!("Fetching page {} of {}...", page, last);
                (page, self.fetch_page(page).await)
            })
            .collect()
            .await;

        let mut batch = PageBatch::default();
        for (page, result) in results {
            batch.report.requested += 1;
            match result {
                Ok(docs) => {
                    log::debug!("Fetched {} records from page {}", docs.len(), page);
                    batch.records.extend(docs);
                }
                Err(e) => {
                    log::warn!("{}", e);
                    batch.report.failed.push(page);
                }
            }
        }

        if !batch.report.failed.is_empty() {
            log::warn!(
                "{} of {} pages failed: {:?}",
                batch.report.failed.len(),
                batch.report.requested,
                batch.report.failed
            );
        }
        batch
    }
}

/// Loads the whole (capped) dataset, read-through and write-through the cache.
#[derive(Clone)]
pub struct Fetcher {
    api: ApiConfig,
    pages: PageFetcher,
    cache: CacheStore,
    cache_key: String,
    legacy_keys: Vec<String>,
}

impl Fetcher {
    pub fn new(config: &Config, backend: Arc<dyn SearchBackend>, cache: CacheStore) -> Self {
        let pages = PageFetcher::new(
            backend,
            config.api.search_expression(),
            config.api.page_size,
            Duration::from_millis(config.api.request_delay_ms),
        );
        Self {
            api: config.api.clone(),
            pages,
            cache,
            cache_key: config.cache_key(),
            legacy_keys: config.cache.legacy_keys.clone(),
        }
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn pages(&self) -> &PageFetcher {
        &self.pages
    }

    /// Evict legacy keys, then serve the current key if it is fresh.
    pub async fn cached(&self) -> Option<Vec<Record>> {
        self.cache
            .evict_legacy(&self.legacy_keys, &self.cache_key)
            .await;
        self.cache.get(&self.cache_key).await
    }

    /// Load the dataset: cache, else count and capped pagination, else fallback.
    pub async fn fetch_all(&self) -> Result<FetchOutcome> {
        if let Some(records) = self.cached().await {
            log::info!("Using cached data with {} records", records.len());
            return Ok(FetchOutcome::cached(records));
        }

        let total = match self.pages.count().await {
            Ok(total) => total,
            Err(e) => {
                log::error!("Error fetching dataset: {}", e);
                return self.fallback(e).await;
            }
        };

        if total == 0 {
            log::info!("No records found with the search query");
            return Ok(FetchOutcome {
                records: Vec::new(),
                origin: Origin::Remote,
                total_available: 0,
                pages: PageReport::default(),
                count_error: None,
            });
        }

        if self.api.page_size == 0 {
            return Err(AppError::config("api.page_size must be > 0"));
        }
        let page_count = total
            .div_ceil(u64::from(self.api.page_size))
            .min(u64::from(self.api.max_pages)) as u32;
        log::info!("Fetching {} pages of data...", page_count);

        let batch = self.pages.fetch_pages(1..=page_count).await;
        log::info!(
            "Successfully fetched {} total records ({} pages ok, {} failed)",
            batch.records.len(),
            batch.report.succeeded(),
            batch.report.failed.len()
        );

        if batch.report.all_failed() {
            log::error!("Every page failed; not caching an empty dataset");
            return Err(AppError::NoDataAvailable);
        }

        self.cache.put(&self.cache_key, &batch.records).await;

        Ok(FetchOutcome {
            records: batch.records,
            origin: Origin::Remote,
            total_available: total,
            pages: batch.report,
            count_error: None,
        })
    }

    /// Best-effort recovery with the narrow fallback query.
    pub async fn fallback(&self, cause: AppError) -> Result<FetchOutcome> {
        log::info!("Trying fallback approach with simpler query...");
        let query = SearchQuery::first(&self.api.fallback_query, self.api.fallback_page_size);

        match self.pages.backend.search(&query).await {
            Ok(response) => {
                log::info!("Fallback successful, fetched {} records", response.docs.len());
                self.cache.put(&self.cache_key, &response.docs).await;
                Ok(FetchOutcome {
                    total_available: response.docs.len() as u64,
                    records: response.docs,
                    origin: Origin::Fallback,
                    pages: PageReport {
                        requested: 1,
                        failed: Vec::new(),
                    },
                    count_error: Some(cause.to_string()),
                })
            }
            Err(e) => {
                log::error!("Fallback also failed: {}", e);
                Err(AppError::NoDataAvailable)
            }
        }
    }
}
