use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Catalog-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub seed: SeedConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Storefront base URL used to build item URLs
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Minimum time between two task launches (milliseconds)
    #[serde(rename = "launch-spacing-ms", default = "default_launch_spacing_ms")]
    pub launch_spacing_ms: u64,

    /// Number of items per listing page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// Total time allowed for one request (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Time allowed to establish a connection (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Skip listing discovery when a previous run already wrote the listing frontier
    #[serde(rename = "reuse-discovered-listings", default = "default_true")]
    pub reuse_discovered_listings: bool,
}

impl CrawlerConfig {
    /// Launch spacing as a duration
    pub fn launch_spacing(&self) -> Duration {
        Duration::from_millis(self.launch_spacing_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// How the set of listing pages is seeded
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum SeedConfig {
    /// Read category URLs from a taxonomy sitemap, then paginate each category
    Sitemap {
        #[serde(rename = "sitemap-url")]
        sitemap_url: String,
    },

    /// Paginate a fixed list of category URLs
    Categories { categories: Vec<String> },

    /// Visit a fixed page range of a single listing, without pagination metadata
    PageRange {
        #[serde(rename = "listing-url")]
        listing_url: String,
        #[serde(rename = "first-page")]
        first_page: u32,
        #[serde(rename = "last-page")]
        last_page: u32,
    },
}

impl SeedConfig {
    /// Short name of the strategy, as written in the config file
    pub fn strategy_name(&self) -> &'static str {
        match self {
            Self::Sitemap { .. } => "sitemap",
            Self::Categories { .. } => "categories",
            Self::PageRange { .. } => "page-range",
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Settings passed to the extraction adapter
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Constant value of the Supplier column
    #[serde(rename = "supplier-name", default = "default_supplier_name")]
    pub supplier_name: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            supplier_name: default_supplier_name(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// JSON-lines journal of extracted products
    #[serde(rename = "accumulator-path")]
    pub accumulator_path: String,

    /// JSON-lines journal of processed listing pages
    #[serde(rename = "listing-ledger-path")]
    pub listing_ledger_path: String,

    /// Text file with every discovered listing URL
    #[serde(rename = "listing-frontier-path")]
    pub listing_frontier_path: String,

    /// Path to the CSV dataset
    #[serde(rename = "dataset-path")]
    pub dataset_path: String,
}

impl OutputConfig {
    /// All output paths with their config key, in declaration order
    pub fn paths(&self) -> [(&'static str, &str); 4] {
        [
            ("accumulator-path", self.accumulator_path.as_str()),
            ("listing-ledger-path", self.listing_ledger_path.as_str()),
            ("listing-frontier-path", self.listing_frontier_path.as_str()),
            ("dataset-path", self.dataset_path.as_str()),
        ]
    }
}

fn default_launch_spacing_ms() -> u64 {
    100
}

fn default_page_size() -> u32 {
    20
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_supplier_name() -> String {
    "igefa Handelsgesellschaft".to_string()
}
