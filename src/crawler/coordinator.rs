//! Crawler coordinator - main run orchestration logic
//!
//! This module sequences the pipeline stages of a run:
//! - Resolving seeds and discovering listing pages
//! - Visiting listing pages and recording the item URLs they yield
//! - Visiting pending item pages and accumulating extracted records
//! - Materializing the dataset
//!
//! Every stage reads the durable stores when its batch is built, so a run
//! that was killed at any point is resumed by simply starting it again.

use crate::config::{check_output_paths, Config, SeedConfig};
use crate::ConfigError;
use crate::crawler::discovery::{
    discover_listing_pages, extract_item_urls, parse_sitemap_locations, range_listing_urls,
};
use crate::crawler::fetcher::{fetch_document, HttpTransport, Transport};
use crate::crawler::scheduler::Scheduler;
use crate::extract::{ExtractionAdapter, Field, FieldMap, StorefrontAdapter};
use crate::output::write_dataset;
use crate::state::{RunState, Stage};
use crate::storage::{
    lock, shared, FrontierFile, ListingLedger, ListingRecord, ProductStore, RecordStore,
    SharedProducts, SharedStore,
};
use crate::HarvestError;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Completed tasks between two progress log lines
const PROGRESS_INTERVAL: usize = 100;

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    transport: Arc<dyn Transport>,
    adapter: Arc<dyn ExtractionAdapter>,
    products: SharedProducts,
    ledger: SharedStore<ListingRecord>,
    frontier: FrontierFile,
    scheduler: Scheduler,
    state: RunState,
}

impl Coordinator {
    /// Creates a coordinator that talks to the live storefront
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Output paths are writable and the stores are open
    /// * `Err(HarvestError)` - Configuration or storage failure
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        let transport = HttpTransport::new(&config.crawler, &config.user_agent)?;
        let adapter = StorefrontAdapter::new().map_err(ConfigError::ExtractionRules)?;

        Self::with_collaborators(config, Arc::new(transport), Arc::new(adapter))
    }

    /// Creates a coordinator with the given transport and extraction adapter
    ///
    /// Output paths are probed before any store is opened; an unwritable
    /// path fails with `ConfigError::UnwritablePath`.
    pub fn with_collaborators(
        config: Config,
        transport: Arc<dyn Transport>,
        adapter: Arc<dyn ExtractionAdapter>,
    ) -> Result<Self, HarvestError> {
        check_output_paths(&config.output)?;

        let products = ProductStore::open(&config.output.accumulator_path)?;
        let ledger = ListingLedger::open(&config.output.listing_ledger_path)?;
        let frontier = FrontierFile::open(&config.output.listing_frontier_path)?;

        tracing::info!(
            records = products.len(),
            listing_pages = ledger.len(),
            "stores loaded"
        );

        let scheduler = Scheduler::new(config.crawler.launch_spacing());

        Ok(Self {
            config,
            transport,
            adapter,
            products: Arc::new(Mutex::new(products)),
            ledger: shared(ledger),
            frontier,
            scheduler,
            state: RunState::new(),
        })
    }

    /// Replaces the product accumulator opened from the configured path
    pub fn with_product_store<S>(mut self, store: S) -> Self
    where
        S: RecordStore<FieldMap> + Send + 'static,
    {
        self.products = Arc::new(Mutex::new(store));
        self
    }

    /// Current run progress
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Runs every stage from SEEDING to DONE
    ///
    /// Per-item failures are logged and counted. Only configuration and
    /// persistence failures end the run early.
    pub async fn run(&mut self) -> Result<RunState, HarvestError> {
        self.state = RunState::new();
        tracing::info!(
            strategy = self.config.seed.strategy_name(),
            stage = %Stage::Seeding,
            "starting run"
        );

        let reused = self.reusable_listings()?;
        let seeds = match reused {
            Some(_) => Vec::new(),
            None => self.resolve_seeds().await,
        };
        self.state.seeds = seeds.len();

        self.state.advance();
        let listings = match reused {
            Some(listings) => listings,
            None => self.discover_listings(seeds).await?,
        };
        self.state.listings_discovered = listings.len();

        self.state.advance();
        self.fetch_listings(listings).await?;
        self.state.log_progress();

        self.state.advance();
        let pending = self.pending_items()?;

        self.state.advance();
        self.fetch_items(pending).await?;
        self.state.log_progress();

        self.state.advance();
        self.materialize()?;

        self.state.advance();
        self.state.log_summary();

        Ok(self.state.clone())
    }

    /// Listing URLs saved by an earlier run, if they may be reused
    fn reusable_listings(&self) -> Result<Option<Vec<String>>, HarvestError> {
        if !self.config.crawler.reuse_discovered_listings {
            return Ok(None);
        }

        let listings = self.frontier.load()?;
        if listings.is_empty() {
            return Ok(None);
        }

        tracing::info!(
            listings = listings.len(),
            path = %self.frontier.path().display(),
            "reusing discovered listing pages"
        );
        Ok(Some(listings))
    }

    /// SEEDING: the categories to expand into listing pages
    ///
    /// A sitemap that cannot be fetched yields no seeds.
    async fn resolve_seeds(&self) -> Vec<String> {
        match &self.config.seed {
            SeedConfig::Sitemap { sitemap_url } => {
                match fetch_document(self.transport.as_ref(), sitemap_url).await {
                    Ok(xml) => {
                        let seeds = parse_sitemap_locations(&xml);
                        tracing::info!(url = %sitemap_url, seeds = seeds.len(), "sitemap loaded");
                        seeds
                    }
                    Err(e) => {
                        tracing::warn!(url = %sitemap_url, error = %e, "failed to fetch sitemap");
                        Vec::new()
                    }
                }
            }
            SeedConfig::Categories { categories } => categories.clone(),
            SeedConfig::PageRange { listing_url, .. } => vec![listing_url.clone()],
        }
    }

    /// LISTING_DISCOVERY: expands seeds into listing URLs and saves them
    async fn discover_listings(&self, seeds: Vec<String>) -> Result<Vec<String>, HarvestError> {
        let discovered: Vec<String> = match &self.config.seed {
            SeedConfig::PageRange {
                listing_url,
                first_page,
                last_page,
            } => range_listing_urls(listing_url, *first_page, *last_page)?,
            _ => {
                let transport = Arc::clone(&self.transport);
                let page_size = self.config.crawler.page_size;

                let mut report = self
                    .scheduler
                    .run_batch(Stage::ListingDiscovery.as_str(), seeds, |url| {
                        let transport = Arc::clone(&transport);
                        async move {
                            discover_listing_pages(transport.as_ref(), &url, page_size).await
                        }
                    })
                    .await;
                if let Some(fatal) = report.take_fatal() {
                    return Err(fatal);
                }
                report.into_successes().into_iter().flatten().collect()
            }
        };

        let mut seen = HashSet::new();
        let listings: Vec<String> = discovered
            .into_iter()
            .filter(|url| seen.insert(url.clone()))
            .collect();

        self.frontier.store(&listings)?;
        tracing::info!(listings = listings.len(), "listing pages discovered");
        Ok(listings)
    }

    /// LISTING_FETCH: visits listing pages missing from the ledger
    ///
    /// A page is recorded only when it yields at least one item URL, so an
    /// empty or failed page is visited again by the next run.
    async fn fetch_listings(&mut self, listings: Vec<String>) -> Result<(), HarvestError> {
        let pending: Vec<String> = {
            let ledger = lock(&self.ledger)?;
            listings.into_iter().filter(|url| !ledger.has(url)).collect()
        };
        self.state.listings_skipped = self.state.listings_discovered - pending.len();
        tracing::info!(
            pending = pending.len(),
            skipped = self.state.listings_skipped,
            "fetching listing pages"
        );

        let total = pending.len();
        let transport = Arc::clone(&self.transport);
        let ledger = Arc::clone(&self.ledger);
        let base_url: Arc<str> = Arc::from(self.config.crawler.base_url.as_str());
        let completed = Arc::new(AtomicUsize::new(0));

        let mut report = self
            .scheduler
            .run_batch(Stage::ListingFetch.as_str(), pending, |url| {
                let transport = Arc::clone(&transport);
                let ledger = Arc::clone(&ledger);
                let base_url = Arc::clone(&base_url);
                let completed = Arc::clone(&completed);
                async move {
                    let document = fetch_document(transport.as_ref(), &url)
                        .await
                        .map_err(|source| HarvestError::Transport {
                            url: url.clone(),
                            source,
                        })?;

                    let items = extract_item_urls(&base_url, &document);
                    let found = items.len();
                    if found == 0 {
                        tracing::debug!(url = %url, "listing page yielded no items");
                    } else {
                        lock(&ledger)?.put(
                            &url,
                            ListingRecord {
                                items: items.into_iter().collect(),
                            },
                        )?;
                    }

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if done % PROGRESS_INTERVAL == 0 {
                        tracing::info!(done, total, "listing pages visited");
                    }
                    Ok::<_, HarvestError>(found)
                }
            })
            .await;

        if let Some(fatal) = report.take_fatal() {
            return Err(fatal);
        }

        let failed = report.failed();
        let yields = report.into_successes();
        let empty = yields.iter().filter(|found| **found == 0).count();
        self.state.listings_processed = yields.len() - empty;
        self.state.listings_failed = failed + empty;
        Ok(())
    }

    /// ITEM_DISCOVERY: item URLs known from the ledger but not yet extracted
    fn pending_items(&mut self) -> Result<Vec<String>, HarvestError> {
        let ledger = lock(&self.ledger)?;
        let products = lock(&self.products)?;

        let mut known = HashSet::new();
        let mut pending = Vec::new();
        for (_, record) in ledger.iter() {
            for item in &record.items {
                if known.insert(item.as_str()) && !products.has(item) {
                    pending.push(item.clone());
                }
            }
        }

        self.state.items_discovered = known.len();
        self.state.items_pending = pending.len();
        tracing::info!(
            known = known.len(),
            pending = pending.len(),
            done = products.len(),
            "item pages discovered"
        );
        Ok(pending)
    }

    /// ITEM_FETCH: visits, extracts and records every pending item
    async fn fetch_items(&mut self, pending: Vec<String>) -> Result<(), HarvestError> {
        let total = pending.len();
        let transport = Arc::clone(&self.transport);
        let adapter = Arc::clone(&self.adapter);
        let products = Arc::clone(&self.products);
        let supplier: Arc<str> = Arc::from(self.config.extraction.supplier_name.as_str());
        let completed = Arc::new(AtomicUsize::new(0));

        let mut report = self
            .scheduler
            .run_batch(Stage::ItemFetch.as_str(), pending, |url| {
                let transport = Arc::clone(&transport);
                let adapter = Arc::clone(&adapter);
                let products = Arc::clone(&products);
                let supplier = Arc::clone(&supplier);
                let completed = Arc::clone(&completed);
                async move {
                    let document = fetch_document(transport.as_ref(), &url)
                        .await
                        .map_err(|source| HarvestError::Transport {
                            url: url.clone(),
                            source,
                        })?;

                    let mut fields =
                        adapter
                            .extract(&document)
                            .map_err(|source| HarvestError::Extraction {
                                url: url.clone(),
                                source,
                            })?;
                    fields.set(Field::Supplier, Some(supplier.to_string()));
                    fields.set(Field::SupplierUrl, Some(url.clone()));

                    lock(&products)?.put(&url, fields)?;
                    tracing::debug!(url = %url, "item recorded");

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if done % PROGRESS_INTERVAL == 0 {
                        tracing::info!(done, total, "item pages recorded");
                    }
                    Ok::<_, HarvestError>(())
                }
            })
            .await;

        if let Some(fatal) = report.take_fatal() {
            return Err(fatal);
        }

        self.state.items_processed = report.succeeded();
        self.state.items_failed = report.failed();
        Ok(())
    }

    /// MATERIALIZE: writes the dataset from the accumulator
    fn materialize(&mut self) -> Result<(), HarvestError> {
        let records = lock(&self.products)?.materialize();
        let path = Path::new(&self.config.output.dataset_path);
        self.state.records_materialized = write_dataset(&records, path)?;
        Ok(())
    }
}

/// Runs a complete crawl against the live storefront
///
/// # Arguments
///
/// * `config` - The validated configuration
///
/// # Returns
///
/// * `Ok(RunState)` - Final counters of the run
/// * `Err(HarvestError)` - A fatal error stopped the run
pub async fn run_crawl(config: Config) -> Result<RunState, HarvestError> {
    let mut coordinator = Coordinator::new(config)?;
    coordinator.run().await
}

/// Writes the dataset from the current accumulator without crawling
///
/// # Returns
///
/// * `Ok(usize)` - Number of rows written
/// * `Err(HarvestError)` - Configuration, storage or output failure
pub fn export_dataset(config: &Config) -> Result<usize, HarvestError> {
    check_output_paths(&config.output)?;
    let products = ProductStore::open(&config.output.accumulator_path)?;
    let rows = write_dataset(&products.materialize(), Path::new(&config.output.dataset_path))?;
    Ok(rows)
}
