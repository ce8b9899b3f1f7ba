//! Browsing session.
//!
//! A [`Session`] owns the loaded records, the filtered view, the criteria and
//! the pagination state. All changes go through [`Session::dispatch`], which
//! applies one [`Intent`] and reports any follow-up work as an [`Effect`]; the
//! caller runs effects with [`Session::run`] and draws with
//! [`Session::render`].
//!
//! View status moves `Loading -> Loaded | Error`. Filter, page and view
//! changes keep it `Loaded`, and background batch loads never touch it.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crate::models::{
    Config, DateRangeKey, FacetOptions, FilterCriteria, Record, ViewConfig, ViewMode,
};
use crate::pipeline::filter::{facet_options, filter_records};
use crate::pipeline::pagination::{PageState, Paginator};
use crate::pipeline::render::{PageView, Renderer};
use crate::services::{BatchLoader, BatchTicket, FetchOutcome, Fetcher, Origin, PageBatch, PageReport};
use crate::utils::debounce::Debouncer;

/// How the session acquires its records.
pub enum Loader {
    /// Whole capped dataset in one load
    Full(Fetcher),
    /// Batch 0 first, the rest on demand
    Batched(BatchLoader),
}

impl Loader {
    pub fn from_config(config: &Config, fetcher: Fetcher) -> Self {
        if config.batch.enabled {
            Loader::Batched(BatchLoader::new(fetcher, &config.batch))
        } else {
            Loader::Full(fetcher)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewStatus {
    Loading,
    Error(String),
    Loaded,
}

/// A user action or a completed background load.
#[derive(Debug, Clone)]
pub enum Intent {
    SetSearchTerm(String),
    ToggleType(String),
    ToggleInstitution(String),
    SetDateRange(Option<DateRangeKey>),
    ClearFilters,
    SetPageSize(usize),
    NextPage,
    PrevPage,
    GoToPage(usize),
    SetView(ViewMode),
    BatchLoaded { ticket: BatchTicket, batch: PageBatch },
}

/// Work requested by a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    LoadBatch(BatchTicket),
}

/// Where the current dataset came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub origin: Origin,
    pub total_available: u64,
    pub pages: PageReport,
    pub count_error: Option<String>,
}

impl LoadSummary {
    fn of(outcome: &FetchOutcome) -> Self {
        Self {
            origin: outcome.origin,
            total_available: outcome.total_available,
            pages: outcome.pages.clone(),
            count_error: outcome.count_error.clone(),
        }
    }
}

pub struct Session {
    loader: Loader,
    records: Vec<Record>,
    filtered: Vec<Record>,
    criteria: FilterCriteria,
    pager: Paginator,
    view: ViewMode,
    status: ViewStatus,
    summary: Option<LoadSummary>,
    search_input: Debouncer<String>,
}

impl Session {
    pub fn new(loader: Loader, view: &ViewConfig) -> Self {
        Self {
            loader,
            records: Vec::new(),
            filtered: Vec::new(),
            criteria: FilterCriteria::default(),
            pager: Paginator::new(view.items_per_page),
            view: view.default_view,
            status: ViewStatus::Loading,
            summary: None,
            search_input: Debouncer::new(Duration::from_millis(view.search_debounce_ms)),
        }
    }

    pub fn status(&self) -> &ViewStatus {
        &self.status
    }

    pub fn summary(&self) -> Option<&LoadSummary> {
        self.summary.as_ref()
    }

    /// Every record loaded so far.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn filtered(&self) -> &[Record] {
        &self.filtered
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn batch_loader(&self) -> Option<&BatchLoader> {
        match &self.loader {
            Loader::Batched(loader) => Some(loader),
            Loader::Full(_) => None,
        }
    }

    pub fn page_state(&self) -> PageState {
        self.pager.state(self.filtered.len())
    }

    /// Records on the current page.
    pub fn current_page(&self) -> &[Record] {
        self.pager.window(&self.filtered)
    }

    /// Facet menu values drawn from everything loaded.
    pub fn facet_options(&self) -> FacetOptions {
        facet_options(&self.records)
    }

    /// Load (or reload) the dataset.
    pub async fn load(&mut self) -> Effect {
        self.status = ViewStatus::Loading;

        let result = match &mut self.loader {
            Loader::Full(fetcher) => fetcher.fetch_all().await,
            Loader::Batched(loader) => loader.load_initial_batch().await,
        };

        match result {
            Ok(outcome) => {
                log::info!(
                    "Loaded {} records ({:?}, {} available)",
                    outcome.records.len(),
                    outcome.origin,
                    outcome.total_available
                );
                self.summary = Some(LoadSummary::of(&outcome));
                self.records = outcome.records;
                self.pager.reset();
                self.refilter();
                self.status = ViewStatus::Loaded;
                self.prefetch()
            }
            Err(e) => {
                log::error!("Failed to load dataset: {}", e);
                self.records.clear();
                self.filtered.clear();
                self.summary = None;
                self.status = ViewStatus::Error(e.to_string());
                Effect::None
            }
        }
    }

    /// Apply one intent.
    pub fn dispatch(&mut self, intent: Intent) -> Effect {
        match intent {
            Intent::SetSearchTerm(term) => {
                self.search_input.cancel();
                self.criteria.search_term = term;
                self.criteria_changed();
            }
            Intent::ToggleType(value) => {
                toggle(&mut self.criteria.types, value);
                self.criteria_changed();
            }
            Intent::ToggleInstitution(value) => {
                toggle(&mut self.criteria.institutions, value);
                self.criteria_changed();
            }
            Intent::SetDateRange(key) => {
                self.criteria.date_range = key;
                self.criteria_changed();
            }
            Intent::ClearFilters => {
                self.search_input.cancel();
                self.criteria = FilterCriteria::default();
                self.criteria_changed();
            }
            Intent::SetPageSize(size) => self.pager.set_page_size(size),
            Intent::NextPage => {
                self.pager.next(self.filtered.len());
            }
            Intent::PrevPage => {
                self.pager.prev();
            }
            Intent::GoToPage(page) => {
                self.pager.go_to(page, self.filtered.len());
            }
            Intent::SetView(mode) => self.view = mode,
            Intent::BatchLoaded { ticket, batch } => {
                let Loader::Batched(loader) = &mut self.loader else {
                    return Effect::None;
                };
                let Some(records) = loader.complete(&ticket, batch) else {
                    return Effect::None;
                };
                // Appends keep the reader's page.
                self.records.extend(records);
                self.refilter();
            }
        }
        self.prefetch()
    }

    /// Carry out `effect` and return whatever it leads to.
    pub async fn run(&mut self, effect: Effect) -> Effect {
        let Effect::LoadBatch(ticket) = effect else {
            return Effect::None;
        };
        let Loader::Batched(loader) = &self.loader else {
            return Effect::None;
        };

        let pages = loader.page_fetcher();
        let batch = ticket.fetch(&pages).await;
        let next = self.dispatch(Intent::BatchLoaded { ticket, batch });

        if let Loader::Batched(loader) = &self.loader {
            loader.store_if_complete(&self.records).await;
        }
        next
    }

    /// Run effects until none remain.
    pub async fn settle(&mut self, mut effect: Effect) {
        while effect != Effect::None {
            effect = self.run(effect).await;
        }
    }

    /// Load batches until `page` of the filtered view exists.
    ///
    /// Stops early when the dataset is exhausted or a batch fails; returns
    /// whether the page exists.
    pub async fn load_through(&mut self, page: usize) -> bool {
        let mut pending = Effect::None;
        while page > self.page_state().total_pages {
            let effect = match std::mem::replace(&mut pending, Effect::None) {
                Effect::None => match self.claim_next_batch() {
                    Some(ticket) => Effect::LoadBatch(ticket),
                    None => break,
                },
                effect => effect,
            };
            let before = self.records.len();
            pending = self.run(effect).await;
            if self.records.len() == before {
                break;
            }
        }
        self.settle(pending).await;
        page <= self.page_state().total_pages
    }

    /// Queue search input typed at `now`.
    pub fn input_search(&mut self, text: impl Into<String>, now: Instant) {
        self.search_input.push(text.into(), now);
    }

    /// Apply queued search input once it has been quiet long enough.
    pub fn poll_search(&mut self, now: Instant) -> Effect {
        match self.search_input.poll(now) {
            Some(term) => self.dispatch(Intent::SetSearchTerm(term)),
            None => Effect::None,
        }
    }

    pub fn search_deadline(&self) -> Option<Instant> {
        self.search_input.deadline()
    }

    pub fn render(&self, renderer: &mut dyn Renderer) {
        match &self.status {
            ViewStatus::Loading => renderer.loading(),
            ViewStatus::Error(message) => renderer.error(message),
            ViewStatus::Loaded => renderer.page(PageView {
                records: self.current_page(),
                mode: self.view,
                pagination: self.page_state(),
            }),
        }
    }

    fn criteria_changed(&mut self) {
        self.pager.reset();
        self.refilter();
    }

    fn refilter(&mut self) {
        self.filtered = filter_records(&self.records, &self.criteria);
    }

    fn prefetch(&mut self) -> Effect {
        if self.status != ViewStatus::Loaded {
            return Effect::None;
        }
        let Loader::Batched(loader) = &mut self.loader else {
            return Effect::None;
        };
        loader
            .maybe_prefetch_next(self.pager.page(), self.pager.page_size(), self.records.len())
            .map_or(Effect::None, Effect::LoadBatch)
    }

    fn claim_next_batch(&mut self) -> Option<BatchTicket> {
        let Loader::Batched(loader) = &mut self.loader else {
            return None;
        };
        let batch = loader.next_unloaded()?;
        loader.begin(batch)
    }
}

fn toggle(set: &mut BTreeSet<String>, value: String) {
    if !set.remove(&value) {
        set.insert(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::services::testing::FakeBackend;
    use crate::storage::{CacheStore, MemoryStore};

    #[derive(Default)]
    struct Recorder {
        frames: Vec<String>,
        ids: Vec<String>,
        pagination: Option<PageState>,
    }

    impl Renderer for Recorder {
        fn loading(&mut self) {
            self.frames.push("loading".into());
        }

        fn error(&mut self, message: &str) {
            self.frames.push(format!("error: {message}"));
        }

        fn page(&mut self, view: PageView<'_>) {
            self.frames.push(format!("page: {}", view.mode));
            self.ids = view.records.iter().filter_map(|r| r.id.clone()).collect();
            self.pagination = Some(view.pagination);
        }
    }

    fn session(backend: FakeBackend, batched: bool) -> (Session, Arc<MemoryStore>) {
        let mut config = Config::default();
        config.api.request_delay_ms = 0;
        config.batch.enabled = batched;
        let store = Arc::new(MemoryStore::new());
        let cache = CacheStore::new(store.clone(), 24);
        let fetcher = Fetcher::new(&config, Arc::new(backend), cache);
        let session = Session::new(Loader::from_config(&config, fetcher), &config.view);
        (session, store)
    }

    #[tokio::test]
    async fn test_load_and_render_first_page() {
        let (mut session, store) = session(FakeBackend::with_records(250), false);
        let mut recorder = Recorder::default();
        session.render(&mut recorder);
        assert_eq!(recorder.frames, vec!["loading"]);

        assert_eq!(session.load().await, Effect::None);
        assert_eq!(session.status(), &ViewStatus::Loaded);
        assert_eq!(session.summary().unwrap().origin, Origin::Remote);
        assert_eq!(store.len(), 1);

        session.render(&mut recorder);
        assert_eq!(recorder.frames[1], "page: tile");
        assert_eq!(recorder.ids.len(), 20);
        assert_eq!(recorder.ids[0], "r0");
        let pagination = recorder.pagination.unwrap();
        assert_eq!(pagination.total_pages, 13);
        assert!(!pagination.has_prev());
        assert!(pagination.has_next());
    }

    #[tokio::test]
    async fn test_filter_change_resets_page() {
        let (mut session, _) = session(FakeBackend::with_records(250), false);
        session.load().await;

        session.dispatch(Intent::GoToPage(3));
        assert_eq!(session.page_state().current, 3);

        session.dispatch(Intent::SetSearchTerm("Item 1".into()));
        assert_eq!(session.page_state().current, 1);
        // "Item 1", "Item 10".."Item 19", "Item 100".."Item 199"
        assert_eq!(session.filtered().len(), 111);
        assert_eq!(session.page_state().total_pages, 6);

        session.dispatch(Intent::NextPage);
        session.dispatch(Intent::SetPageSize(50));
        assert_eq!(session.page_state().current, 1);
        assert_eq!(session.page_state().total_pages, 3);
    }

    #[tokio::test]
    async fn test_navigation_past_boundaries_is_noop() {
        let (mut session, _) = session(FakeBackend::with_records(45), false);
        session.load().await;

        session.dispatch(Intent::PrevPage);
        assert_eq!(session.page_state().current, 1);

        session.dispatch(Intent::GoToPage(3));
        session.dispatch(Intent::NextPage);
        assert_eq!(session.page_state().current, 3);
        assert_eq!(session.current_page().len(), 5);

        session.dispatch(Intent::GoToPage(9));
        assert_eq!(session.page_state().current, 3);
    }

    #[tokio::test]
    async fn test_toggle_and_clear_filters() {
        let (mut session, _) = session(FakeBackend::with_records(30), false);
        session.load().await;

        session.dispatch(Intent::ToggleInstitution("Unknown".into()));
        assert_eq!(session.filtered().len(), 30);
        session.dispatch(Intent::ToggleType("image".into()));
        assert!(session.filtered().is_empty());
        assert!(!session.page_state().is_visible());

        session.dispatch(Intent::ToggleType("image".into()));
        assert_eq!(session.filtered().len(), 30);

        session.dispatch(Intent::SetDateRange(Some(DateRangeKey::After2000)));
        assert!(session.filtered().is_empty());

        session.dispatch(Intent::ClearFilters);
        assert!(session.criteria().is_empty());
        assert_eq!(session.filtered().len(), 30);
    }

    #[tokio::test]
    async fn test_view_change_keeps_page() {
        let (mut session, _) = session(FakeBackend::with_records(100), false);
        session.load().await;
        session.dispatch(Intent::GoToPage(2));
        session.dispatch(Intent::SetView(ViewMode::List));

        let mut recorder = Recorder::default();
        session.render(&mut recorder);
        assert_eq!(recorder.frames, vec!["page: list"]);
        assert_eq!(recorder.pagination.unwrap().current, 2);
    }

    #[tokio::test]
    async fn test_unrecoverable_load_shows_error_only() {
        let mut fake = FakeBackend::with_records(10);
        fake.fail_counts = true;
        fake.fail_expressions
            .insert("\"ancient egypt\" OR \"egyptian\"".to_string());
        let (mut session, _) = session(fake, false);

        session.load().await;
        assert!(matches!(session.status(), ViewStatus::Error(_)));

        let mut recorder = Recorder::default();
        session.render(&mut recorder);
        assert_eq!(recorder.frames.len(), 1);
        assert!(recorder.frames[0].starts_with("error: "));
        assert!(recorder.pagination.is_none());
    }

    #[tokio::test]
    async fn test_debounced_search_applies_last_value() {
        let (mut session, _) = session(FakeBackend::with_records(50), false);
        session.load().await;
        session.dispatch(Intent::GoToPage(2));

        let start = Instant::now();
        session.input_search("Item", start);
        session.input_search("Item 4", start + Duration::from_millis(100));
        assert_eq!(session.poll_search(start + Duration::from_millis(300)), Effect::None);
        assert_eq!(session.criteria().search_term, "");
        assert_eq!(session.page_state().current, 2);

        session.poll_search(start + Duration::from_millis(400));
        assert_eq!(session.criteria().search_term, "Item 4");
        assert_eq!(session.page_state().current, 1);
        // "Item 4", "Item 40".."Item 49"
        assert_eq!(session.filtered().len(), 11);
        assert!(session.search_deadline().is_none());
    }

    #[tokio::test]
    async fn test_batch_prefetch_appends_and_keeps_page() {
        let (mut session, _) = session(FakeBackend::with_records(2_500), true);
        assert_eq!(session.load().await, Effect::None);
        assert_eq!(session.records().len(), 1_000);

        let effect = session.dispatch(Intent::GoToPage(40));
        let Effect::LoadBatch(ticket) = &effect else {
            panic!("expected a batch load, got {effect:?}");
        };
        assert_eq!(ticket.batch, 1);

        assert_eq!(session.run(effect).await, Effect::None);
        assert_eq!(session.records().len(), 2_000);
        assert_eq!(session.page_state().current, 40);
        assert_eq!(session.status(), &ViewStatus::Loaded);
    }

    #[tokio::test]
    async fn test_batch_from_before_reload_is_discarded() {
        let (mut session, _) = session(FakeBackend::with_records(2_500), true);
        session.load().await;
        let effect = session.dispatch(Intent::GoToPage(45));
        assert!(matches!(effect, Effect::LoadBatch(_)));

        session.load().await;
        session.run(effect).await;
        assert_eq!(session.records().len(), 1_000);
    }

    #[tokio::test]
    async fn test_load_through_fetches_until_page_exists() {
        let (mut session, store) = session(FakeBackend::with_records(2_500), true);
        session.load().await;

        assert!(session.load_through(60).await);
        assert_eq!(session.records().len(), 2_000);
        session.dispatch(Intent::GoToPage(60));
        assert_eq!(session.page_state().current, 60);
        assert_eq!(session.current_page()[0].id.as_deref(), Some("r1180"));

        assert!(!session.load_through(200).await);
        assert_eq!(session.records().len(), 2_500);
        assert!(session.batch_loader().unwrap().all_loaded());
        assert_eq!(store.len(), 1);
    }
}
