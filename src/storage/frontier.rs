use crate::storage::traits::{StorageError, StorageResult};
use crate::storage::write_atomically;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Text file holding a set of work URLs, one per line
///
/// Used for the listing frontier: the full set of listing pages produced by
/// discovery, so a restarted run can skip rediscovering them.
#[derive(Debug, Clone)]
pub struct FrontierFile {
    path: PathBuf,
}

impl FrontierFile {
    /// Opens the frontier file, creating an empty one if it is absent
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            std::fs::File::create(&path).map_err(|e| StorageError::File {
                path: path.display().to_string(),
                source: e,
            })?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every URL, skipping blank lines and repeats
    pub fn load(&self) -> StorageResult<Vec<String>> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| StorageError::File {
            path: self.path.display().to_string(),
            source: e,
        })?;

        let mut seen = HashSet::new();
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter(|line| seen.insert(*line))
            .map(str::to_string)
            .collect())
    }

    /// Replaces the file content with the given URLs
    pub fn store(&self, urls: &[String]) -> StorageResult<()> {
        write_atomically(&self.path, |writer| {
            for url in urls {
                writeln!(writer, "{}", url)?;
            }
            Ok::<(), StorageError>(())
        })
    }
}
