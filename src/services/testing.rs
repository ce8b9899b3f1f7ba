//! In-memory search backend for unit tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::{Record, SearchResponse};
use crate::services::{SearchBackend, SearchQuery};

/// Serves a fixed corpus and fails on request.
#[derive(Default)]
pub struct FakeBackend {
    pub corpus: Vec<Record>,
    /// Every count probe fails
    pub fail_counts: bool,
    /// Every request with one of these expressions fails
    pub fail_expressions: HashSet<String>,
    /// Explicit page requests with these numbers fail
    pub fail_pages: HashSet<u32>,
    calls: Mutex<Vec<SearchQuery>>,
}

impl FakeBackend {
    pub fn with_records(n: usize) -> Self {
        Self {
            corpus: numbered_records(n),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<SearchQuery> {
        self.calls.lock().unwrap().clone()
    }

    pub fn page_calls(&self) -> Vec<u32> {
        self.calls().iter().filter_map(|q| q.page).collect()
    }
}

#[async_trait]
impl SearchBackend for FakeBackend {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        self.calls.lock().unwrap().push(query.clone());

        let failed = (query.is_count() && self.fail_counts)
            || self.fail_expressions.contains(&query.expression)
            || query.page.is_some_and(|p| self.fail_pages.contains(&p));
        if failed {
            return Err(AppError::Status {
                status: 500,
                body: "internal error".into(),
            });
        }

        let count = self.corpus.len() as u64;
        if query.is_count() {
            return Ok(SearchResponse {
                count,
                docs: Vec::new(),
            });
        }

        let size = query.page_size as usize;
        let start = (query.page.unwrap_or(1) as usize - 1) * size;
        let docs = self
            .corpus
            .iter()
            .skip(start)
            .take(size)
            .cloned()
            .collect();
        Ok(SearchResponse { count, docs })
    }
}

/// Records `r0..r{n-1}` with titles `Item {i}`.
pub fn numbered_records(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            serde_json::from_value(json!({
                "id": format!("r{i}"),
                "sourceResource": { "title": [format!("Item {i}")] }
            }))
            .unwrap()
        })
        .collect()
}
