//! End-to-end browsing over a disk-backed cache and a scripted endpoint.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use nile_catalog::{
    error::{AppError, Result},
    models::{Config, DateRangeKey, Record, SearchResponse, ViewMode},
    pipeline::{Effect, Intent, Loader, PageView, Renderer, Session, ViewStatus},
    services::{Fetcher, Origin, SearchBackend, SearchQuery},
    storage::{CacheStore, LocalStorage},
};
use serde_json::json;
use tempfile::TempDir;

/// Endpoint serving a small catalog of generated records.
struct Catalog {
    records: Vec<Record>,
    requests: AtomicUsize,
    down: bool,
}

impl Catalog {
    fn new(n: usize) -> Self {
        let records = (0..n)
            .map(|i| {
                let (kind, provider) = if i % 2 == 0 {
                    ("image", "Brooklyn Museum")
                } else {
                    ("text", "Library of Congress")
                };
                serde_json::from_value(json!({
                    "id": format!("item-{i}"),
                    "provider": { "name": provider },
                    "sourceResource": {
                        "title": format!("Object {i} from Thebes"),
                        "type": kind,
                        "date": { "displayDate": format!("{}", 1850 + i) }
                    }
                }))
                .unwrap()
            })
            .collect();
        Self {
            records,
            requests: AtomicUsize::new(0),
            down: false,
        }
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchBackend for Catalog {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.down {
            return Err(AppError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }

        let size = query.page_size as usize;
        let start = (query.page.unwrap_or(1) as usize - 1) * size;
        Ok(SearchResponse {
            count: self.records.len() as u64,
            docs: self.records.iter().skip(start).take(size).cloned().collect(),
        })
    }
}

#[derive(Default)]
struct Capture {
    titles: Vec<String>,
    mode: Option<ViewMode>,
    error: Option<String>,
}

impl Renderer for Capture {
    fn loading(&mut self) {}

    fn error(&mut self, message: &str) {
        self.error = Some(message.to_string());
    }

    fn page(&mut self, view: PageView<'_>) {
        self.titles = view
            .records
            .iter()
            .map(|r| r.display_title().to_string())
            .collect();
        self.mode = Some(view.mode);
    }
}

fn config(batched: bool) -> Config {
    let mut config = Config::default();
    config.api.request_delay_ms = 0;
    config.api.page_size = 10;
    config.batch.enabled = batched;
    config.batch.batch_size = 30;
    config.view.items_per_page = 5;
    config
}

fn session(config: &Config, dir: &TempDir, backend: Arc<Catalog>) -> Session {
    let cache = CacheStore::new(Arc::new(LocalStorage::new(dir.path())), 24);
    let fetcher = Fetcher::new(config, backend, cache);
    Session::new(Loader::from_config(config, fetcher), &config.view)
}

#[tokio::test]
async fn test_second_session_is_served_from_disk_cache() {
    let dir = TempDir::new().unwrap();
    let config = config(false);

    let first = Arc::new(Catalog::new(42));
    let mut session_a = session(&config, &dir, first.clone());
    session_a.load().await;
    assert_eq!(session_a.records().len(), 42);
    assert_eq!(first.requests(), 1 + 5);

    let second = Arc::new(Catalog::new(42));
    let mut session_b = session(&config, &dir, second.clone());
    session_b.load().await;
    assert_eq!(session_b.summary().unwrap().origin, Origin::Cache);
    assert_eq!(session_b.records(), session_a.records());
    assert_eq!(second.requests(), 0);
}

#[tokio::test]
async fn test_browse_with_facets_and_pages() {
    let dir = TempDir::new().unwrap();
    let config = config(false);
    let mut session = session(&config, &dir, Arc::new(Catalog::new(42)));
    session.load().await;

    let options = session.facet_options();
    assert_eq!(options.types, vec!["image", "text"]);
    assert_eq!(
        options.institutions,
        vec!["Brooklyn Museum", "Library of Congress"]
    );

    session.dispatch(Intent::ToggleType("image".into()));
    session.dispatch(Intent::SetDateRange(Some(DateRangeKey::From1800To1900)));
    // Even items are images; every date falls in 1850..=1891.
    assert_eq!(session.filtered().len(), 21);
    assert_eq!(session.page_state().total_pages, 5);

    session.dispatch(Intent::GoToPage(5));
    session.dispatch(Intent::SetView(ViewMode::List));
    let mut capture = Capture::default();
    session.render(&mut capture);
    assert_eq!(capture.titles, vec!["Object 40 from Thebes"]);
    assert_eq!(capture.mode, Some(ViewMode::List));

    session.dispatch(Intent::SetSearchTerm("object 4".into()));
    assert_eq!(session.page_state().current, 1);
    let ids: Vec<_> = session
        .filtered()
        .iter()
        .filter_map(|r| r.id.as_deref())
        .collect();
    assert_eq!(ids, vec!["item-4", "item-40"]);
}

#[tokio::test]
async fn test_batched_session_grows_as_reader_advances() {
    let dir = TempDir::new().unwrap();
    let config = config(true);
    let backend = Arc::new(Catalog::new(75));
    let mut reader = session(&config, &dir, backend);

    let effect = reader.load().await;
    assert_eq!(reader.records().len(), 30);
    // (1 + 1) * 5 + 200 already exceeds 30 loaded records.
    let Effect::LoadBatch(ticket) = &effect else {
        panic!("expected prefetch, got {effect:?}");
    };
    assert_eq!(ticket.records, 30..60);

    reader.settle(effect).await;
    assert_eq!(reader.records().len(), 75);
    assert_eq!(reader.status(), &ViewStatus::Loaded);
    assert!(reader.batch_loader().unwrap().all_loaded());

    let mut again = session(&config, &dir, Arc::new(Catalog::new(75)));
    again.load().await;
    assert_eq!(again.summary().unwrap().origin, Origin::Cache);
    assert_eq!(again.records().len(), 75);
}

#[tokio::test]
async fn test_endpoint_down_shows_error() {
    let dir = TempDir::new().unwrap();
    let config = config(false);
    let mut catalog = Catalog::new(5);
    catalog.down = true;
    let mut session = session(&config, &dir, Arc::new(catalog));

    assert_eq!(session.load().await, Effect::None);
    let mut capture = Capture::default();
    session.render(&mut capture);
    assert!(capture.error.is_some());
    assert!(capture.titles.is_empty());
    assert!(!session.page_state().is_visible());
}
