//! Local library index: which tracks already sit on disk.

use crate::core::types::Codec;
use crate::core::utils::sanitize_name;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Snapshot of file names (with extension) present in a track directory.
pub type LocalFileSet = HashSet<String>;

/// Track directories under a working root.
#[derive(Debug, Clone)]
pub struct LocalLibrary {
    root: PathBuf,
}

impl LocalLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path for a directory name, or `None` if nothing survives sanitization.
    pub fn directory_path(&self, directory: &str) -> Option<PathBuf> {
        let name = sanitize_name(directory);
        if name.trim().is_empty() {
            None
        } else {
            Some(self.root.join(name))
        }
    }

    /// Names of `codec` files in `directory`, sorted. No recursion.
    ///
    /// A bad path (empty after sanitization, missing, not a directory) is
    /// logged and yields an empty list; it is not an error.
    pub fn list_downloaded(&self, directory: &str, codec: Codec) -> Vec<String> {
        let dir = match self.directory_path(directory) {
            Some(dir) if dir.is_dir() => dir,
            _ => {
                log::error!("Bad library path: {:?} under {}", directory, self.root.display());
                return Vec::new();
            }
        };

        let entries = match fs_err::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::error!("Failed to list {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        let suffix = format!(".{}", codec.extension());
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.ends_with(&suffix))
            .collect();
        names.sort();
        names
    }

    /// Read-only dedup snapshot for one batch.
    pub fn snapshot(&self, directory: &str, codec: Codec) -> LocalFileSet {
        self.list_downloaded(directory, codec).into_iter().collect()
    }
}
