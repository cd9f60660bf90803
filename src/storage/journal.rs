//! JSON-lines journal store
//!
//! Each line of the journal is one `{"url": ..., "record": ...}` object.
//! `put` appends a line and syncs it to disk before returning; the last line
//! for a URL wins. The journal is read in full on open, and rewritten
//! atomically when it holds superseded lines or an interrupted final append.

use crate::storage::traits::{RecordStore, StorageError, StorageResult};
use crate::storage::write_atomically;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct EntryRef<'a, V> {
    url: &'a str,
    record: &'a V,
}

#[derive(Deserialize)]
struct Entry<V> {
    url: String,
    record: V,
}

/// Journal contents as read from disk
struct LoadedJournal<V> {
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
    needs_compaction: bool,
}

/// Record store persisted as an append-only JSON-lines journal
pub struct JournalStore<V> {
    path: PathBuf,
    file: Option<File>,
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
    poisoned: bool,
}

impl<V> JournalStore<V>
where
    V: Serialize + DeserializeOwned + Clone,
{
    /// Opens the journal at `path`, creating an empty one if it is absent
    ///
    /// # Returns
    ///
    /// * `Ok(JournalStore)` - Journal loaded (and compacted if needed)
    /// * `Err(StorageError::Corrupt)` - A line other than an interrupted
    ///   final append could not be parsed
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let shown = path.display().to_string();
        let loaded = load::<V>(&path, &shown)?;

        if loaded.needs_compaction {
            tracing::info!(path = %shown, records = loaded.entries.len(), "compacting journal");
            rewrite(&path, &loaded.entries)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::File {
                path: shown.clone(),
                source: e,
            })?;

        tracing::debug!(path = %shown, records = loaded.entries.len(), "journal opened");

        Ok(Self {
            path,
            file: Some(file),
            entries: loaded.entries,
            index: loaded.index,
            poisoned: false,
        })
    }

    /// Loads the journal at `path` without creating, compacting or writing it
    ///
    /// A missing journal reads as empty. `put` on the returned store fails
    /// with `StorageError::ReadOnly`.
    pub fn open_read_only(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let shown = path.display().to_string();
        let loaded = load::<V>(&path, &shown)?;

        Ok(Self {
            path,
            file: None,
            entries: loaded.entries,
            index: loaded.index,
            poisoned: false,
        })
    }

    /// Path of the journal file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Iterates over `(url, record)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(url, record)| (url.as_str(), record))
    }

    fn append_line(file: &mut File, line: &[u8]) -> std::io::Result<()> {
        file.write_all(line)?;
        file.sync_data()
    }
}

impl<V> RecordStore<V> for JournalStore<V>
where
    V: Serialize + DeserializeOwned + Clone,
{
    fn has(&self, url: &str) -> bool {
        self.index.contains_key(url)
    }

    fn get(&self, url: &str) -> Option<&V> {
        self.index.get(url).map(|&idx| &self.entries[idx].1)
    }

    fn keys(&self) -> HashSet<String> {
        self.index.keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn put(&mut self, url: &str, record: V) -> StorageResult<()> {
        if self.poisoned {
            return Err(StorageError::Poisoned(self.path.display().to_string()));
        }
        let Some(file) = self.file.as_mut() else {
            return Err(StorageError::ReadOnly(self.path.display().to_string()));
        };

        let mut line = serde_json::to_string(&EntryRef {
            url,
            record: &record,
        })?;
        line.push('\n');

        // A failed append may leave a partial line behind; any further append
        // would bury it mid-file, so the store stops accepting writes.
        if let Err(e) = Self::append_line(file, line.as_bytes()) {
            self.poisoned = true;
            return Err(StorageError::File {
                path: self.path.display().to_string(),
                source: e,
            });
        }

        upsert(&mut self.entries, &mut self.index, url.to_string(), record);
        Ok(())
    }

    fn materialize(&self) -> Vec<V> {
        self.entries.iter().map(|(_, record)| record.clone()).collect()
    }
}

fn upsert<V>(
    entries: &mut Vec<(String, V)>,
    index: &mut HashMap<String, usize>,
    url: String,
    record: V,
) -> bool {
    match index.get(&url) {
        Some(&idx) => {
            entries[idx].1 = record;
            true
        }
        None => {
            index.insert(url.clone(), entries.len());
            entries.push((url, record));
            false
        }
    }
}

fn load<V: DeserializeOwned>(path: &Path, shown: &str) -> StorageResult<LoadedJournal<V>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(StorageError::File {
                path: shown.to_string(),
                source: e,
            })
        }
    };
    parse_journal(&content, shown)
}

fn parse_journal<V: DeserializeOwned>(content: &str, path: &str) -> StorageResult<LoadedJournal<V>> {
    let mut entries = Vec::new();
    let mut index = HashMap::new();
    let mut needs_compaction = !content.is_empty() && !content.ends_with('\n');

    let lines: Vec<(usize, &str)> = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .collect();
    let last = lines.len().saturating_sub(1);

    for (pos, (lineno, line)) in lines.iter().enumerate() {
        match serde_json::from_str::<Entry<V>>(line) {
            Ok(entry) => {
                if upsert(&mut entries, &mut index, entry.url, entry.record) {
                    needs_compaction = true;
                }
            }
            Err(e) if pos == last && !content.ends_with('\n') => {
                tracing::warn!(
                    path,
                    line = lineno + 1,
                    error = %e,
                    "dropping truncated final journal line"
                );
                needs_compaction = true;
            }
            Err(e) => {
                return Err(StorageError::Corrupt {
                    path: path.to_string(),
                    line: lineno + 1,
                    message: e.to_string(),
                })
            }
        }
    }

    Ok(LoadedJournal {
        entries,
        index,
        needs_compaction,
    })
}

fn rewrite<V: Serialize>(path: &Path, entries: &[(String, V)]) -> StorageResult<()> {
    write_atomically(path, |writer| {
        for (url, record) in entries {
            serde_json::to_writer(&mut *writer, &EntryRef { url, record })?;
            writer.write_all(b"\n")?;
        }
        Ok::<(), StorageError>(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ListingRecord;
    use tempfile::TempDir;

    fn listing(items: &[&str]) -> ListingRecord {
        ListingRecord {
            items: items.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_open_creates_empty_journal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.jsonl");

        let store = JournalStore::<ListingRecord>::open(&path).unwrap();
        assert!(store.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn test_put_is_visible_after_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.jsonl");

        {
            let mut store = JournalStore::open(&path).unwrap();
            store.put("https://s.example/c?page=1", listing(&["a"])).unwrap();
            store.put("https://s.example/c?page=2", listing(&["b", "c"])).unwrap();
        }

        let store = JournalStore::<ListingRecord>::open(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.has("https://s.example/c?page=1"));
        assert_eq!(
            store.get("https://s.example/c?page=2").unwrap().items,
            vec!["b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn test_overwrite_keeps_insertion_position() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.jsonl");

        let mut store = JournalStore::open(&path).unwrap();
        store.put("first", listing(&["1"])).unwrap();
        store.put("second", listing(&["2"])).unwrap();
        store.put("first", listing(&["1b"])).unwrap();

        let records = store.materialize();
        assert_eq!(records, vec![listing(&["1b"]), listing(&["2"])]);
        drop(store);

        // Superseded line is compacted away on reopen
        let store = JournalStore::<ListingRecord>::open(&path).unwrap();
        assert_eq!(store.materialize(), vec![listing(&["1b"]), listing(&["2"])]);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_keys_lists_every_recorded_url() {
        let dir = TempDir::new().unwrap();
        let mut store = JournalStore::open(dir.path().join("ledger.jsonl")).unwrap();
        store.put("a", listing(&[])).unwrap();
        store.put("b", listing(&["x"])).unwrap();
        store.put("a", listing(&["y"])).unwrap();

        let keys = store.keys();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains("a") && keys.contains("b"));
        assert_eq!(store.path(), dir.path().join("ledger.jsonl"));
    }

    #[test]
    fn test_truncated_final_line_is_dropped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.jsonl");
        std::fs::write(
            &path,
            "{\"url\":\"kept\",\"record\":{\"items\":[\"x\"]}}\n{\"url\":\"lost\",\"rec",
        )
        .unwrap();

        let mut store = JournalStore::<ListingRecord>::open(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.has("kept"));
        assert!(!store.has("lost"));

        // Appends after recovery land on a clean line
        store.put("next", listing(&["y"])).unwrap();
        drop(store);
        let store = JournalStore::<ListingRecord>::open(&path).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_corrupt_middle_line_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.jsonl");
        std::fs::write(
            &path,
            "{\"url\":\"a\",\"record\":{\"items\":[]}}\nnot json\n{\"url\":\"b\",\"record\":{\"items\":[]}}\n",
        )
        .unwrap();

        let result = JournalStore::<ListingRecord>::open(&path);
        assert!(matches!(
            result,
            Err(StorageError::Corrupt { line: 2, .. })
        ));
    }

    #[test]
    fn test_hand_edited_journal_is_accepted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.jsonl");
        std::fs::write(
            &path,
            "\n  { \"url\" : \"a\",  \"record\": { \"items\": [ \"i1\" ] } }  \n\n{\"url\":\"b\",\"record\":{\"items\":[]}}",
        )
        .unwrap();

        let mut store = JournalStore::<ListingRecord>::open(&path).unwrap();
        assert_eq!(store.len(), 2);

        // Missing trailing newline was normalized before appending
        store.put("c", listing(&[])).unwrap();
        drop(store);
        let store = JournalStore::<ListingRecord>::open(&path).unwrap();
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_read_only_open_leaves_journal_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let content = "{\"url\":\"a\",\"record\":{\"items\":[]}}\n{\"url\":\"a\",\"record\":{\"items\":[\"x\"]}}\n{\"url\":\"b\",\"rec";
        std::fs::write(&path, content).unwrap();

        let mut store = JournalStore::<ListingRecord>::open_read_only(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().items, vec!["x".to_string()]);
        assert!(matches!(
            store.put("c", listing(&[])),
            Err(StorageError::ReadOnly(_))
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), content);

        let missing = dir.path().join("absent.jsonl");
        let store = JournalStore::<ListingRecord>::open_read_only(&missing).unwrap();
        assert!(store.is_empty());
        assert!(!missing.exists());
    }
}
