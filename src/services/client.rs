//! Search endpoint client.
//!
//! The proxy forwards `endpoint`, `q`, `page_size` and `page` to the
//! aggregator's item search. `page_size=0` is a count-only probe.

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ApiConfig, SearchResponse};
use crate::utils::http::create_async_client;

/// One request against the search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchQuery {
    pub expression: String,
    pub page_size: u32,
    /// 1-based API page; `None` leaves the endpoint's default
    pub page: Option<u32>,
}

impl SearchQuery {
    /// Count probe: no documents, only `count`.
    pub fn count(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            page_size: 0,
            page: None,
        }
    }

    pub fn page(expression: impl Into<String>, page_size: u32, page: u32) -> Self {
        Self {
            expression: expression.into(),
            page_size,
            page: Some(page),
        }
    }

    /// First page without an explicit `page` parameter.
    pub fn first(expression: impl Into<String>, page_size: u32) -> Self {
        Self {
            expression: expression.into(),
            page_size,
            page: None,
        }
    }

    pub fn is_count(&self) -> bool {
        self.page_size == 0
    }
}

/// Anything that can answer a search query.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run `query`; any non-success response is an error.
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse>;
}

/// HTTP client for the search proxy.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: Client,
    base_url: Url,
}

impl ProxyClient {
    pub fn new(client: Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            base_url: Url::parse(base_url.trim())?,
        })
    }

    /// Build a client from the API configuration.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let client = create_async_client(config)?;
        Self::new(client, &config.proxy_url)
    }

    /// Full request URL for `query`.
    pub fn request_url(&self, query: &SearchQuery) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("endpoint", "items")
                .append_pair("q", &query.expression)
                .append_pair("page_size", &query.page_size.to_string());
            if let Some(page) = query.page {
                pairs.append_pair("page", &page.to_string());
            }
        }
        url
    }
}

#[async_trait]
impl SearchBackend for ProxyClient {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        let url = self.request_url(query);
        log::debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("API error response ({}): {}", status, body);
            return Err(AppError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<SearchResponse>().await?)
    }
}
