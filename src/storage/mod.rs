//! Storage module for persisting crawl progress
//!
//! This module handles all on-disk state of the crawler:
//! - The product accumulator (URL -> extracted fields)
//! - The listing ledger (listing URL -> item URLs it yielded)
//! - The listing frontier (every discovered listing URL)
//!
//! All three are plain text so they can be inspected and corrected by hand
//! between runs.

mod frontier;
mod journal;
mod traits;

pub use frontier::FrontierFile;
pub use journal::JournalStore;
pub use traits::{RecordStore, StorageError, StorageResult};

use crate::extract::FieldMap;
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Outcome recorded for a processed listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    /// Item URLs found on the page
    pub items: Vec<String>,
}

/// Journal of extracted products
pub type ProductStore = JournalStore<FieldMap>;

/// Journal of processed listing pages
pub type ListingLedger = JournalStore<ListingRecord>;

/// A store shared between concurrently running tasks
///
/// Every access goes through the mutex, so writes are serialized.
pub type SharedStore<V> = Arc<Mutex<JournalStore<V>>>;

/// The product accumulator as seen by the crawler
pub type SharedProducts = Arc<Mutex<dyn RecordStore<FieldMap> + Send>>;

/// Wraps a store for sharing between tasks
pub fn shared<V>(store: JournalStore<V>) -> SharedStore<V> {
    Arc::new(Mutex::new(store))
}

/// Locks a shared store
pub fn lock<S: ?Sized>(store: &Arc<Mutex<S>>) -> StorageResult<MutexGuard<'_, S>> {
    store.lock().map_err(|_| StorageError::LockPoisoned)
}

/// Replaces the file at `path` with whatever `write` produces
///
/// The content goes to a temp file in the same directory, is synced, and is
/// renamed over `path`. Readers see either the old or the new content.
pub(crate) fn write_atomically<E, F>(path: &Path, write: F) -> Result<(), E>
where
    E: From<std::io::Error>,
    F: FnOnce(&mut dyn Write) -> Result<(), E>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
