//! Crawler module for catalog discovery and fetching
//!
//! This module contains the core crawling logic, including:
//! - The transport seam and its reqwest-backed implementation
//! - Listing and item URL discovery
//! - The rate-limited batch scheduler
//! - Overall run coordination

mod coordinator;
mod discovery;
mod fetcher;
mod scheduler;

pub use coordinator::{export_dataset, run_crawl, Coordinator};
pub use discovery::{
    discover_listing_pages, extract_item_urls, listing_urls, page_count, parse_sitemap_locations,
    parse_total_items, range_listing_urls,
};
pub use fetcher::{
    build_http_client, fetch_document, FetchResponse, HttpTransport, Transport, TransportError,
};
pub use scheduler::{BatchReport, Scheduler, TaskOutcome};

use crate::config::Config;
use crate::state::RunState;
use crate::HarvestError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Probe the output paths and open the durable stores
/// 2. Resolve seeds and discover listing pages
/// 3. Visit listing pages not yet recorded
/// 4. Visit and extract item pages not yet recorded
/// 5. Write the dataset
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(RunState)` - Crawl completed; per-item failures are only counted
/// * `Err(HarvestError)` - Crawl stopped on a fatal error
pub async fn crawl(config: Config) -> Result<RunState, HarvestError> {
    run_crawl(config).await
}
