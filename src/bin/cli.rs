//! Nile Catalog CLI
//!
//! Terminal front end for browsing the DPLA ancient Egypt collection.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use nile_catalog::{
    error::{AppError, Result},
    models::{Config, DateRangeKey, ViewMode},
    pipeline::{Intent, Loader, PageView, Renderer, Session, ViewStatus},
    services::{Fetcher, ProxyClient},
    storage::{CacheStore, LocalStorage},
    utils::truncate_text,
};

/// Nile Catalog - ancient Egypt collection browser
#[derive(Parser, Debug)]
#[command(
    name = "nile-catalog",
    version,
    about = "Browse the DPLA ancient Egypt collection from the terminal"
)]
struct Cli {
    /// Path to the configuration file (default: {storage_dir}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cache directory (overrides cache.dir)
    #[arg(short, long)]
    storage_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the dataset (cache or remote) and print a summary
    Fetch,

    /// Filter and print one page of the dataset
    Browse(BrowseArgs),

    /// List the type and institution facet values
    Facets,

    /// Inspect or clear the dataset cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Validate the configuration
    Validate,
}

#[derive(Args, Debug)]
struct BrowseArgs {
    /// Free-text search over title, description, subjects and places
    #[arg(long)]
    search: Option<String>,

    /// Item type to include (repeatable)
    #[arg(long = "type")]
    types: Vec<String>,

    /// Contributing institution to include (repeatable)
    #[arg(long = "institution")]
    institutions: Vec<String>,

    /// before-1800, 1800-1900, 1900-1950, 1950-2000 or after-2000
    #[arg(long)]
    date_range: Option<DateRangeKey>,

    /// Items per page (defaults to view.items_per_page)
    #[arg(long)]
    page_size: Option<usize>,

    #[arg(long, default_value_t = 1)]
    page: usize,

    /// list, tile or compact-image (defaults to view.default_view)
    #[arg(long)]
    view: Option<ViewMode>,
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Show the current cache entry
    Info,
    /// Remove the current and legacy cache entries
    Clear,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Plain-text page printer.
struct TextRenderer;

impl Renderer for TextRenderer {
    fn loading(&mut self) {
        println!("Loading collection...");
    }

    fn error(&mut self, message: &str) {
        println!("Error loading collection: {message}");
    }

    fn page(&mut self, view: PageView<'_>) {
        let state = view.pagination;
        if view.records.is_empty() {
            println!("No items found.");
        }

        let offset = (state.current - 1) * state.page_size;
        for (i, record) in view.records.iter().enumerate() {
            let number = offset + i + 1;
            let visual = record
                .thumbnail()
                .map(str::to_string)
                .unwrap_or_else(|| format!("[{}]", record.placeholder_icon()));

            match view.mode {
                ViewMode::List => {
                    println!("{number}. {}", record.display_title());
                    let year = record.year().map(|y| y.to_string()).unwrap_or_default();
                    println!("   {} {}", record.provider_name(), year);
                    if let Some(limit) = view.mode.description_limit() {
                        println!("   {}", truncate_text(record.display_description(), limit));
                    }
                    println!("   {}", record.item_url());
                }
                ViewMode::Tile => {
                    println!("{number}. {} {}", visual, record.display_title());
                    println!("   {}", record.provider_name());
                }
                ViewMode::CompactImage => {
                    println!("{number}. {}", visual);
                    println!("   {}", record.display_title());
                    if let Some(limit) = view.mode.description_limit() {
                        println!("   {}", truncate_text(record.display_description(), limit));
                    }
                }
            }
        }

        if state.is_visible() {
            println!(
                "{} Page {} of {} ({} items) {}",
                if state.has_prev() { "<" } else { " " },
                state.current,
                state.total_pages,
                state.total_items,
                if state.has_next() { ">" } else { " " },
            );
        }
    }
}

fn open_session(config: &Config, cache: CacheStore) -> Result<Session> {
    let backend = Arc::new(ProxyClient::from_config(&config.api)?);
    let fetcher = Fetcher::new(config, backend, cache);
    Ok(Session::new(
        Loader::from_config(config, fetcher),
        &config.view,
    ))
}

/// Load the dataset, failing the command if nothing could be loaded.
async fn load(session: &mut Session) -> Result<()> {
    let effect = session.load().await;
    if let ViewStatus::Error(message) = session.status() {
        log::error!("{}", message);
        return Err(AppError::NoDataAvailable);
    }
    session.settle(effect).await;
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(|| {
        cli.storage_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("storage"))
            .join("config.toml")
    });
    let mut config = Config::load_or_default(&config_path);
    if let Some(dir) = &cli.storage_dir {
        config.cache.dir = dir.display().to_string();
    }
    log::info!("Loaded configuration from {}", config_path.display());

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }

    let store = Arc::new(LocalStorage::with_quota(
        &config.cache.dir,
        config.cache.quota_bytes,
    ));
    let cache = CacheStore::new(store, config.cache.ttl_hours);

    match cli.command {
        Command::Fetch => {
            let mut session = open_session(&config, cache)?;
            load(&mut session).await?;

            if let Some(summary) = session.summary() {
                log::info!("Origin: {:?}", summary.origin);
                log::info!("Records loaded: {}", session.records().len());
                log::info!("Records available: {}", summary.total_available);
                if !summary.pages.failed.is_empty() {
                    log::warn!("Failed pages: {:?}", summary.pages.failed);
                }
                if let Some(cause) = &summary.count_error {
                    log::warn!("Primary query failed: {}", cause);
                }
            }
        }

        Command::Browse(args) => {
            let mut session = open_session(&config, cache)?;
            load(&mut session).await?;

            if let Some(view) = args.view {
                session.dispatch(Intent::SetView(view));
            }
            if let Some(size) = args.page_size {
                session.dispatch(Intent::SetPageSize(size));
            }
            if let Some(term) = args.search {
                session.dispatch(Intent::SetSearchTerm(term));
            }
            for value in args.types {
                session.dispatch(Intent::ToggleType(value));
            }
            for value in args.institutions {
                session.dispatch(Intent::ToggleInstitution(value));
            }
            if args.date_range.is_some() {
                session.dispatch(Intent::SetDateRange(args.date_range));
            }

            if !session.load_through(args.page).await && args.page > 1 {
                log::warn!(
                    "Page {} is past the end; showing page {}",
                    args.page,
                    session.page_state().current
                );
            }
            let effect = session.dispatch(Intent::GoToPage(args.page));
            session.settle(effect).await;

            session.render(&mut TextRenderer);
        }

        Command::Facets => {
            let mut session = open_session(&config, cache)?;
            load(&mut session).await?;
            // Facet menus reflect the whole dataset.
            session.load_through(usize::MAX).await;

            let options = session.facet_options();
            println!("Types:");
            for value in &options.types {
                println!("  {value}");
            }
            println!("Institutions:");
            for value in &options.institutions {
                println!("  {value}");
            }
            println!("Date ranges:");
            for key in DateRangeKey::ALL {
                println!("  {key}");
            }
        }

        Command::Cache { action } => {
            let key = config.cache_key();
            match action {
                CacheAction::Info => {
                    log::info!("Cache directory: {}", config.cache.dir);
                    log::info!("Current key: {}", key);
                    match cache.peek(&key).await {
                        Some(entry) => {
                            let age = entry.age(Utc::now());
                            log::info!("Records: {}", entry.data.len());
                            log::info!(
                                "Age: {}h {}m ({})",
                                age.num_hours(),
                                age.num_minutes() % 60,
                                if entry.is_fresh(Utc::now(), cache.ttl()) {
                                    "fresh"
                                } else {
                                    "expired"
                                }
                            );
                        }
                        None => log::info!("No cached dataset."),
                    }
                    for legacy in &config.cache.legacy_keys {
                        if cache.peek(legacy).await.is_some() {
                            log::info!("Legacy entry present: {}", legacy);
                        }
                    }
                }
                CacheAction::Clear => {
                    cache.evict(&key).await;
                    cache.evict_legacy(&config.cache.legacy_keys, &key).await;
                    log::info!("Cache cleared");
                }
            }
        }

        Command::Validate => {
            // Already validated above.
            log::info!("Config OK");
            log::info!("Cache key: {}", config.cache_key());
            log::info!("Query: {}", config.api.search_expression());
        }
    }

    Ok(())
}
