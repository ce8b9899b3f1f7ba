//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::models::ViewMode;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote endpoint and query settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Local dataset cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Progressive loading settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Page size, debounce and layout defaults
    #[serde(default)]
    pub view: ViewConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.api.proxy_url.trim().is_empty() {
            return Err(AppError::validation("api.proxy_url is empty"));
        }
        url::Url::parse(self.api.proxy_url.trim())?;
        if self.api.user_agent.trim().is_empty() {
            return Err(AppError::validation("api.user_agent is empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(AppError::validation("api.timeout_secs must be > 0"));
        }
        if self.api.page_size == 0 {
            return Err(AppError::validation("api.page_size must be > 0"));
        }
        if self.api.max_pages == 0 {
            return Err(AppError::validation("api.max_pages must be > 0"));
        }
        if self.api.keyword_limit == 0 || self.api.keywords.is_empty() {
            return Err(AppError::validation("No search keywords defined"));
        }
        if self.cache.ttl_hours == 0 {
            return Err(AppError::validation("cache.ttl_hours must be > 0"));
        }
        if self.batch.batch_size == 0 {
            return Err(AppError::validation("batch.batch_size must be > 0"));
        }
        if self.batch.batch_size % self.api.page_size as usize != 0 {
            return Err(AppError::validation(
                "batch.batch_size must be a multiple of api.page_size",
            ));
        }
        if self.view.items_per_page == 0 {
            return Err(AppError::validation("view.items_per_page must be > 0"));
        }
        Ok(())
    }

    /// Versioned cache key for the current query and paging strategy.
    ///
    /// Any change to the keywords, keyword bound, page size, page cap or
    /// loading mode produces a different key, so snapshots of another shape
    /// are never reused.
    pub fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.api.search_expression().as_bytes());
        hasher.update(self.api.page_size.to_le_bytes());
        hasher.update(self.api.max_pages.to_le_bytes());
        if self.batch.enabled {
            hasher.update(b"batched");
            hasher.update(self.batch.batch_size.to_le_bytes());
        }
        let digest = hex::encode(hasher.finalize());

        format!(
            "{}_v{}_{}",
            self.cache.key_prefix,
            self.cache.version,
            &digest[..12]
        )
    }
}

/// Remote search endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Proxy in front of the aggregator's `items` endpoint
    #[serde(default = "defaults::proxy_url")]
    pub proxy_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Records per API page
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,

    /// Hard cap on pages fetched by a full load
    #[serde(default = "defaults::max_pages")]
    pub max_pages: u32,

    /// Delay between page requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Only the first `keyword_limit` keywords go into the query
    #[serde(default = "defaults::keyword_limit")]
    pub keyword_limit: usize,

    /// Topical keywords, most important first
    #[serde(default = "defaults::keywords")]
    pub keywords: Vec<String>,

    /// Narrow query used when the count probe fails
    #[serde(default = "defaults::fallback_query")]
    pub fallback_query: String,

    #[serde(default = "defaults::page_size")]
    pub fallback_page_size: u32,
}

impl ApiConfig {
    /// Quoted, OR-joined search expression over the bounded keyword list.
    pub fn search_expression(&self) -> String {
        self.keywords
            .iter()
            .take(self.keyword_limit)
            .map(|keyword| format!("\"{keyword}\""))
            .collect::<Vec<_>>()
            .join(" OR ")
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            proxy_url: defaults::proxy_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            page_size: defaults::page_size(),
            max_pages: defaults::max_pages(),
            request_delay_ms: defaults::request_delay(),
            keyword_limit: defaults::keyword_limit(),
            keywords: defaults::keywords(),
            fallback_query: defaults::fallback_query(),
            fallback_page_size: defaults::page_size(),
        }
    }
}

/// Dataset cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding cache entries
    #[serde(default = "defaults::cache_dir")]
    pub dir: String,

    #[serde(default = "defaults::key_prefix")]
    pub key_prefix: String,

    /// Bumped whenever the stored dataset shape changes
    #[serde(default = "defaults::cache_version")]
    pub version: u32,

    /// Keys written by earlier versions, evicted on startup
    #[serde(default = "defaults::legacy_keys")]
    pub legacy_keys: Vec<String>,

    #[serde(default = "defaults::ttl_hours")]
    pub ttl_hours: u64,

    /// Optional byte budget for a single entry
    #[serde(default)]
    pub quota_bytes: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: defaults::cache_dir(),
            key_prefix: defaults::key_prefix(),
            version: defaults::cache_version(),
            legacy_keys: defaults::legacy_keys(),
            ttl_hours: defaults::ttl_hours(),
            quota_bytes: None,
        }
    }
}

/// Progressive loading settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Load the dataset in batches instead of one capped pass
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    /// Pages beyond the current one that should already be loaded
    #[serde(default = "defaults::lookahead_pages")]
    pub lookahead_pages: usize,

    /// Records of headroom before the next batch is requested
    #[serde(default = "defaults::safety_margin")]
    pub safety_margin: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            batch_size: defaults::batch_size(),
            lookahead_pages: defaults::lookahead_pages(),
            safety_margin: defaults::safety_margin(),
        }
    }
}

/// View defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "defaults::items_per_page")]
    pub items_per_page: usize,

    #[serde(default = "defaults::search_debounce")]
    pub search_debounce_ms: u64,

    #[serde(default)]
    pub default_view: ViewMode,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            items_per_page: defaults::items_per_page(),
            search_debounce_ms: defaults::search_debounce(),
            default_view: ViewMode::default(),
        }
    }
}

mod defaults {
    // Api defaults
    pub fn proxy_url() -> String {
        "https://faas-nyc1-2ef2e6cc.doserverless.co/api/v1/web/fn-db103013-6f04-45ed-9d08-869494cf2959/default/dpla-api-proxy".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; nile-catalog/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn page_size() -> u32 {
        100
    }
    pub fn max_pages() -> u32 {
        20
    }
    pub fn request_delay() -> u64 {
        100
    }
    pub fn keyword_limit() -> usize {
        10
    }
    pub fn keywords() -> Vec<String> {
        [
            "Egypt--Antiquities",
            "Egypt--History--To 332 B.C.",
            "ancient egypt",
            "egyptian",
            "pharaoh",
            "tutankhamun",
            "cleopatra",
            "pyramids",
            "mummies",
            "hieroglyphics",
            "egyptology",
            "Giza",
            "Luxor",
            "Thebes",
            "Karnak",
            "Valley of the Kings",
            "Abu Simbel",
            "Memphis",
            "Nile",
            "sphinx",
            "rosetta stone",
            "ramesses",
            "hatshepsut",
            "akhmenaten",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
    pub fn fallback_query() -> String {
        "\"ancient egypt\" OR \"egyptian\"".into()
    }

    // Cache defaults
    pub fn cache_dir() -> String {
        "storage".into()
    }
    pub fn key_prefix() -> String {
        "dpla_egypt_full_dataset_demo".into()
    }
    pub fn cache_version() -> u32 {
        3
    }
    pub fn legacy_keys() -> Vec<String> {
        vec![
            "dpla_egypt_full_dataset_demo".into(),
            "dpla_egypt_full_dataset_demo_v2".into(),
            "dpla_egypt_full_dataset_demo_v3".into(),
        ]
    }
    pub fn ttl_hours() -> u64 {
        24
    }

    // Batch defaults
    pub fn batch_size() -> usize {
        1000
    }
    pub fn lookahead_pages() -> usize {
        1
    }
    pub fn safety_margin() -> usize {
        200
    }

    // View defaults
    pub fn items_per_page() -> usize {
        20
    }
    pub fn search_debounce() -> u64 {
        300
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let mut config = Config::default();
        config.api.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_misaligned_batch() {
        let mut config = Config::default();
        config.batch.batch_size = 1050;
        assert!(config.validate().is_err());
    }

    #[test]
    fn search_expression_uses_first_keywords() {
        let mut api = ApiConfig::default();
        api.keyword_limit = 2;
        assert_eq!(
            api.search_expression(),
            "\"Egypt--Antiquities\" OR \"Egypt--History--To 332 B.C.\""
        );

        let full = ApiConfig::default().search_expression();
        assert_eq!(full.matches(" OR ").count(), 9);
        assert!(!full.contains("egyptology"));
    }

    #[test]
    fn cache_key_changes_with_query_shape() {
        let base = Config::default();
        let key = base.cache_key();
        assert!(key.starts_with("dpla_egypt_full_dataset_demo_v3_"));
        assert_eq!(key, Config::default().cache_key());

        let mut other = Config::default();
        other.api.keyword_limit = 5;
        assert_ne!(key, other.cache_key());

        let mut batched = Config::default();
        batched.batch.enabled = true;
        assert_ne!(key, batched.cache_key());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [api]
            max_pages = 5

            [view]
            default_view = "list"
            "#,
        )
        .unwrap();
        assert_eq!(config.api.max_pages, 5);
        assert_eq!(config.api.page_size, 100);
        assert_eq!(config.view.default_view, ViewMode::List);
        assert_eq!(config.cache.ttl_hours, 24);
    }
}
