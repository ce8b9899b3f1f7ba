// src/services/batch.rs

//! Progressive dataset acquisition.
//!
//! The dataset is split into fixed-size batches, batch `b` covering records
//! `[b * batch_size, min((b + 1) * batch_size, total))`. Batch 0 is loaded up
//! front; later batches are requested as the reader approaches the end of
//! what is loaded.
//!
//! Each batch moves through `NotLoaded -> Loading -> Loaded`, or to `Failed`
//! when every page of it failed (a failed batch can be retried). At most one
//! batch is in flight; a second request while one is loading is dropped.
//!
//! Loads are split into [`BatchLoader::begin`], an async page fetch, and
//! [`BatchLoader::complete`], so the guard is taken before the first await
//! and the fetch itself only needs a cloned [`PageFetcher`]. Tickets carry the
//! dataset generation; a completion from before the last reload is discarded.

use std::collections::BTreeMap;
use std::ops::{Range, RangeInclusive};

use crate::error::{AppError, Result};
use crate::models::{BatchConfig, Record};
use crate::services::fetcher::{FetchOutcome, Fetcher, Origin, PageBatch, PageFetcher, PageReport};

/// Load state of a single batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    NotLoaded,
    Loading,
    Loaded,
    /// Every page failed; eligible for another attempt
    Failed,
}

/// Permission to load one batch, issued by [`BatchLoader::begin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTicket {
    pub batch: usize,
    pub generation: u64,
    /// Record offsets covered by the batch
    pub records: Range<usize>,
    /// API pages covering those records
    pub pages: RangeInclusive<u32>,
}

impl BatchTicket {
    /// Fetch the ticket's pages.
    pub async fn fetch(&self, pages: &PageFetcher) -> PageBatch {
        log::info!(
            "Loading batch {} (records {}..{}, pages {}..={})",
            self.batch,
            self.records.start,
            self.records.end,
            self.pages.start(),
            self.pages.end()
        );
        pages.fetch_pages(self.pages.clone()).await
    }
}

/// Tracks which batches of the remote dataset are loaded.
pub struct BatchLoader {
    fetcher: Fetcher,
    batch_size: usize,
    lookahead_pages: usize,
    safety_margin: usize,
    states: BTreeMap<usize, BatchState>,
    total_available: Option<usize>,
    in_flight: Option<usize>,
    generation: u64,
}

impl BatchLoader {
    pub fn new(fetcher: Fetcher, config: &BatchConfig) -> Self {
        Self {
            fetcher,
            batch_size: config.batch_size.max(1),
            lookahead_pages: config.lookahead_pages,
            safety_margin: config.safety_margin,
            states: BTreeMap::new(),
            total_available: None,
            in_flight: None,
            generation: 0,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn total_available(&self) -> Option<usize> {
        self.total_available
    }

    /// Number of batches in the dataset, 0 until the total is known.
    pub fn batch_count(&self) -> usize {
        self.total_available
            .map_or(0, |total| total.div_ceil(self.batch_size))
    }

    pub fn state(&self, batch: usize) -> BatchState {
        self.states
            .get(&batch)
            .copied()
            .unwrap_or(BatchState::NotLoaded)
    }

    pub fn loaded_batches(&self) -> Vec<usize> {
        self.states
            .iter()
            .filter(|(_, state)| **state == BatchState::Loaded)
            .map(|(batch, _)| *batch)
            .collect()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn all_loaded(&self) -> bool {
        self.total_available.is_some()
            && (0..self.batch_count()).all(|b| self.state(b) == BatchState::Loaded)
    }

    /// Clone of the page fetcher, for running a ticket outside the loader.
    pub fn page_fetcher(&self) -> PageFetcher {
        self.fetcher.pages().clone()
    }

    /// Lowest batch that still needs loading.
    pub fn next_unloaded(&self) -> Option<usize> {
        (0..self.batch_count()).find(|b| {
            matches!(self.state(*b), BatchState::NotLoaded | BatchState::Failed)
        })
    }

    /// Record and page ranges for `batch`, `None` past the end of the dataset.
    pub fn ticket(&self, batch: usize) -> Option<BatchTicket> {
        let total = self.total_available?;
        let start = batch.checked_mul(self.batch_size)?;
        if start >= total {
            return None;
        }
        let end = (start + self.batch_size).min(total);

        let page_size = self.fetcher.pages().page_size().max(1) as usize;
        let first_page = (start / page_size) as u32 + 1;
        let last_page = end.div_ceil(page_size) as u32;

        Some(BatchTicket {
            batch,
            generation: self.generation,
            records: start..end,
            pages: first_page..=last_page,
        })
    }

    /// Claim `batch` for loading.
    ///
    /// Returns `None`, changing nothing, when the batch is already loaded or
    /// out of range, another batch is in flight, or everything is loaded.
    pub fn begin(&mut self, batch: usize) -> Option<BatchTicket> {
        if self.all_loaded() {
            log::debug!("All batches loaded; ignoring request for batch {}", batch);
            return None;
        }
        if let Some(current) = self.in_flight {
            log::debug!(
                "Batch {} already loading; dropping request for batch {}",
                current,
                batch
            );
            return None;
        }
        if self.state(batch) == BatchState::Loaded {
            return None;
        }

        let ticket = self.ticket(batch)?;
        self.states.insert(batch, BatchState::Loading);
        self.in_flight = Some(batch);
        Some(ticket)
    }

    /// Settle a ticket, releasing the in-flight guard.
    ///
    /// Returns the records to append, or `None` for a stale ticket or a batch
    /// whose pages all failed.
    pub fn complete(&mut self, ticket: &BatchTicket, batch: PageBatch) -> Option<Vec<Record>> {
        if ticket.generation != self.generation {
            log::warn!(
                "Discarding batch {} from an earlier load (generation {} != {})",
                ticket.batch,
                ticket.generation,
                self.generation
            );
            return None;
        }
        if self.in_flight == Some(ticket.batch) {
            self.in_flight = None;
        }

        if batch.report.all_failed() {
            log::error!("Batch {} failed; it will be retried", ticket.batch);
            self.states.insert(ticket.batch, BatchState::Failed);
            return None;
        }

        log::info!(
            "Batch {} loaded: {} records",
            ticket.batch,
            batch.records.len()
        );
        self.states.insert(ticket.batch, BatchState::Loaded);
        Some(batch.records)
    }

    /// Load `batch` start to finish. A no-op under the same conditions as
    /// [`begin`](Self::begin).
    pub async fn load_batch(&mut self, batch: usize) -> Option<Vec<Record>> {
        let ticket = self.begin(batch)?;
        let pages = self.fetcher.pages().clone();
        let fetched = ticket.fetch(&pages).await;
        self.complete(&ticket, fetched)
    }

    /// Batch to request so that `current_page + lookahead` pages stay within
    /// the loaded records plus the safety margin.
    pub fn prefetch_target(
        &self,
        current_page: usize,
        items_per_page: usize,
        loaded: usize,
    ) -> Option<usize> {
        if self.in_flight.is_some() || self.all_loaded() {
            return None;
        }
        let needed = (current_page + self.lookahead_pages) * items_per_page;
        if needed + self.safety_margin < loaded {
            return None;
        }
        self.next_unloaded()
    }

    /// Claim the next batch if the reader is close to the end of the loaded data.
    pub fn maybe_prefetch_next(
        &mut self,
        current_page: usize,
        items_per_page: usize,
        loaded: usize,
    ) -> Option<BatchTicket> {
        let target = self.prefetch_target(current_page, items_per_page, loaded)?;
        self.begin(target)
    }

    /// Start over: forget all batches and bump the generation.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.states.clear();
        self.total_available = None;
        self.in_flight = None;
    }

    /// Load batch 0 (or a complete cached snapshot) and learn the total.
    pub async fn load_initial_batch(&mut self) -> Result<FetchOutcome> {
        self.reset();

        if let Some(records) = self.fetcher.cached().await {
            log::info!("Using cached complete dataset with {} records", records.len());
            self.mark_complete(records.len());
            return Ok(FetchOutcome {
                total_available: records.len() as u64,
                records,
                origin: Origin::Cache,
                pages: PageReport::default(),
                count_error: None,
            });
        }

        let total = match self.fetcher.pages().count().await {
            Ok(total) => total as usize,
            Err(e) => {
                log::error!("Error fetching initial batch: {}", e);
                let outcome = self.fetcher.fallback(e).await?;
                self.mark_complete(outcome.records.len());
                return Ok(outcome);
            }
        };
        self.total_available = Some(total);

        let Some(ticket) = self.begin(0) else {
            log::info!("No records found with the search query");
            return Ok(FetchOutcome {
                records: Vec::new(),
                origin: Origin::Remote,
                total_available: 0,
                pages: PageReport::default(),
                count_error: None,
            });
        };

        let pages = self.fetcher.pages().clone();
        let fetched = ticket.fetch(&pages).await;
        let report = fetched.report.clone();
        let records = self
            .complete(&ticket, fetched)
            .ok_or(AppError::NoDataAvailable)?;

        self.store_if_complete(&records).await;

        Ok(FetchOutcome {
            records,
            origin: Origin::Remote,
            total_available: total as u64,
            pages: report,
            count_error: None,
        })
    }

    /// Write the dataset to the cache once every batch is loaded.
    pub async fn store_if_complete(&self, records: &[Record]) {
        if self.all_loaded() {
            self.fetcher
                .cache()
                .put(self.fetcher.cache_key(), records)
                .await;
        }
    }

    fn mark_complete(&mut self, total: usize) {
        self.total_available = Some(total);
        for batch in 0..self.batch_count() {
            self.states.insert(batch, BatchState::Loaded);
        }
    }
}
