//! Lazy enumeration of staged files

use crate::types::StagedEntry;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Single-pass iterator over the regular files under a staging root
///
/// Walk order is deterministic (sorted by file name within each directory).
/// Directories, symlinks and special files are not yielded.
pub struct StagedEntries {
    root: PathBuf,
    walker: ignore::Walk,
}

impl StagedEntries {
    pub fn new(root: &Path) -> Self {
        let walker = ignore::WalkBuilder::new(root)
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();
        Self {
            root: root.to_path_buf(),
            walker,
        }
    }
}

impl Iterator for StagedEntries {
    type Item = StagedEntry;

    fn next(&mut self) -> Option<StagedEntry> {
        for result in self.walker.by_ref() {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable staging entry: {}", e);
                    continue;
                }
            };

            let Some(file_type) = entry.file_type() else {
                continue;
            };
            if !file_type.is_file() {
                continue;
            }

            let relative_path = match entry.path().strip_prefix(&self.root) {
                Ok(p) => p.to_path_buf(),
                Err(_) => continue,
            };

            let size = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(e) => {
                    warn!(
                        "Skipping {}: failed to read metadata: {}",
                        relative_path.display(),
                        e
                    );
                    continue;
                }
            };

            return Some(StagedEntry::new(
                relative_path,
                entry.path().to_path_buf(),
                size,
            ));
        }
        None
    }
}
