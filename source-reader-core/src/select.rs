//! Walks a checkout and picks the files that become chapters.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::config::SelectionPolicy;
use crate::contract::FileCandidate;
use crate::error::SelectError;

/// Applies a [`SelectionPolicy`] to a directory tree.
pub struct FileSelector<'a> {
    policy: &'a SelectionPolicy,
}

impl<'a> FileSelector<'a> {
    pub fn new(policy: &'a SelectionPolicy) -> Self {
        Self { policy }
    }

    /// Returns accepted files in discovery order, at most `max_file_count` of them.
    ///
    /// Within a directory, its files are visited in listing order before any
    /// subdirectory is entered. Excluded directories are pruned and never read.
    pub fn select(&self, root: &Path) -> Result<Vec<FileCandidate>, SelectError> {
        info!(root = %root.display(), "Selecting files");
        let mut selected = Vec::new();
        if self.policy.max_file_count > 0 {
            let entries = read_dir_in_listing_order(root).map_err(|source| SelectError::Io {
                path: root.to_path_buf(),
                source,
            })?;
            self.visit(entries, &mut selected);
        }
        selected.truncate(self.policy.max_file_count);
        info!(count = selected.len(), "Selection complete");
        Ok(selected)
    }

    fn visit(&self, entries: Vec<fs::DirEntry>, selected: &mut Vec<FileCandidate>) {
        let mut subdirs = Vec::new();

        for entry in entries {
            if selected.len() >= self.policy.max_file_count {
                return;
            }
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();

            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(e) => {
                    debug!(path = %path.display(), error = ?e, "Skipping entry with unknown type");
                    continue;
                }
            };
            if file_type.is_dir() {
                if self.policy.excluded_dir_names.contains(&name) {
                    debug!(path = %path.display(), "Pruning excluded directory");
                } else {
                    subdirs.push(path);
                }
                continue;
            }

            if self.policy.excluded_file_names.contains(&name) {
                debug!(path = %path.display(), "Skipping excluded file");
                continue;
            }

            let metadata = match fs::metadata(&path) {
                Ok(m) => m,
                Err(e) => {
                    debug!(path = %path.display(), error = ?e, "Skipping file of unknown size");
                    continue;
                }
            };
            // Symlinked directories are never followed.
            if metadata.is_dir() {
                continue;
            }
            let size_bytes = metadata.len();
            if size_bytes > self.policy.max_file_size_bytes {
                debug!(path = %path.display(), size = size_bytes, "Skipping large file");
                continue;
            }

            if !self.policy.accepts_extension(&name) {
                continue;
            }

            selected.push(FileCandidate { path, size_bytes });
        }

        for dir in subdirs {
            if selected.len() >= self.policy.max_file_count {
                return;
            }
            match read_dir_in_listing_order(&dir) {
                Ok(entries) => self.visit(entries, selected),
                Err(e) => debug!(path = %dir.display(), error = ?e, "Skipping unreadable directory"),
            }
        }
    }
}

/// Collects a directory's entries in the order the OS lists them.
fn read_dir_in_listing_order(dir: &Path) -> std::io::Result<Vec<fs::DirEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        match entry {
            Ok(e) => entries.push(e),
            Err(e) => debug!(dir = %dir.display(), error = ?e, "Skipping unreadable entry"),
        }
    }
    Ok(entries)
}
