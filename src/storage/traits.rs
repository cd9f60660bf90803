//! Storage traits and error types
//!
//! This module defines the trait interface for record stores and
//! associated error types.

use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    File {
        path: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt journal {path} at line {line}: {message}")]
    Corrupt {
        path: String,
        line: usize,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store {0} refuses writes after an earlier write failure")]
    Poisoned(String),

    #[error("Store {0} was opened read-only")]
    ReadOnly(String),

    #[error("Store lock poisoned by a panicking writer")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A durable mapping from work URL to its recorded outcome
///
/// Presence of a key means the URL's terminal outcome is recorded and the URL
/// must not be fetched again. Callers needing concurrent access wrap the store
/// in a mutex so that `put` calls are serialized.
pub trait RecordStore<V: Clone> {
    /// Returns true if an outcome is recorded for the URL
    fn has(&self, url: &str) -> bool;

    /// Gets the recorded outcome for the URL
    fn get(&self, url: &str) -> Option<&V>;

    /// Returns the set of all recorded URLs
    fn keys(&self) -> HashSet<String>;

    /// Number of recorded URLs
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records or overwrites the outcome for a URL
    ///
    /// The record is durable once this returns `Ok`.
    fn put(&mut self, url: &str, record: V) -> StorageResult<()>;

    /// Returns every recorded outcome in insertion order
    ///
    /// Overwriting a URL keeps its original position.
    fn materialize(&self) -> Vec<V>;
}
