//! Output module for the dataset and run reports
//!
//! This module handles:
//! - Materializing the accumulator as the CSV dataset
//! - Computing and printing statistics over the durable stores

mod dataset;
pub mod stats;

pub use dataset::write_dataset;
pub use stats::{collect_statistics, load_statistics, print_statistics, DatasetStatistics};

use thiserror::Error;

/// Errors raised while writing output files
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
