//! Statistics over the durable stores
//!
//! This module reads the product accumulator and the listing ledger and
//! reports how far the crawl has progressed.

use crate::config::OutputConfig;
use crate::extract::Field;
use crate::storage::{ListingLedger, ProductStore, RecordStore};
use crate::HarvestError;
use std::collections::HashSet;

/// Progress summary of the accumulated crawl
#[derive(Debug, Clone)]
pub struct DatasetStatistics {
    /// Number of product records in the accumulator
    pub records: usize,

    /// Number of listing pages in the ledger
    pub listing_pages: usize,

    /// Distinct item URLs referenced by the ledger
    pub known_items: usize,

    /// Known item URLs without a product record
    pub pending_items: usize,

    /// Records holding a value, per field, in column order
    pub field_coverage: Vec<(Field, usize)>,
}

/// Computes statistics from open stores
pub fn collect_statistics(products: &ProductStore, ledger: &ListingLedger) -> DatasetStatistics {
    let known: HashSet<&str> = ledger
        .iter()
        .flat_map(|(_, record)| record.items.iter().map(String::as_str))
        .collect();
    let pending_items = known.iter().filter(|url| !products.has(url)).count();

    let field_coverage = Field::ALL
        .iter()
        .map(|field| {
            let present = products
                .iter()
                .filter(|(_, record)| record.get(*field).is_some())
                .count();
            (*field, present)
        })
        .collect();

    DatasetStatistics {
        records: products.len(),
        listing_pages: ledger.len(),
        known_items: known.len(),
        pending_items,
        field_coverage,
    }
}

/// Reads the stores named in the output configuration and computes statistics
///
/// The stores are opened read-only: missing journals count as empty and
/// nothing on disk is created or compacted.
///
/// # Returns
///
/// * `Ok(DatasetStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - A store could not be opened
pub fn load_statistics(output: &OutputConfig) -> Result<DatasetStatistics, HarvestError> {
    let products = ProductStore::open_read_only(&output.accumulator_path)?;
    let ledger = ListingLedger::open_read_only(&output.listing_ledger_path)?;
    Ok(collect_statistics(&products, &ledger))
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &DatasetStatistics) {
    println!("=== Catalog Statistics ===\n");

    println!("Overview:");
    println!("  Product records: {}", stats.records);
    println!("  Listing pages processed: {}", stats.listing_pages);
    println!("  Item URLs known: {}", stats.known_items);
    println!("  Item URLs pending: {}", stats.pending_items);
    println!();

    println!("Field Coverage:");
    for (field, present) in &stats.field_coverage {
        let percentage = if stats.records > 0 {
            (*present as f64 / stats.records as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", field, present, percentage);
    }
    println!();

    let completion = if stats.known_items > 0 {
        ((stats.known_items - stats.pending_items) as f64 / stats.known_items as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Completion: {:.1}% ({} / {} known items extracted)",
        completion,
        stats.known_items - stats.pending_items,
        stats.known_items
    );
}
