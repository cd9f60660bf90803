//! Catalog-Harvest: a resumable product catalog crawler
//!
//! This crate crawls a storefront catalog (category listings, then product
//! pages), extracts a fixed set of product attributes, and accumulates them in
//! a durable journal so that an interrupted run can simply be restarted. The
//! accumulated records are finally materialized as a CSV dataset.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Catalog-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error for {url}: {source}")]
    Transport {
        url: String,
        source: crawler::TransportError,
    },

    #[error("Extraction error for {url}: {source}")]
    Extraction {
        url: String,
        source: extract::ExtractionError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Task for {url} panicked")]
    TaskPanicked { url: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Returns true if this error must abort the whole run
    ///
    /// Transport, extraction and URL errors are scoped to a single work item
    /// and only ever cost that item its results.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Storage(_) | Self::Output(_) | Self::Io(_)
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Output path is not writable: {path} ({reason})")]
    UnwritablePath { path: String, reason: String },

    #[error("Extraction rules could not be built: {0}")]
    ExtractionRules(extract::ExtractionError),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),
}

/// Result type alias for Catalog-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use extract::{ExtractionAdapter, Field, FieldMap};
pub use state::{RunState, Stage};
