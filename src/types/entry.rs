//! StagedEntry and TargetEntry - the two sides of a comparison

use crate::hash::{compute_hash, ContentHash};
use crate::types::MirrorError;
use std::path::{Path, PathBuf};

/// A regular file extracted into the staging directory for this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedEntry {
    /// Relative path from the staging root
    pub relative_path: PathBuf,

    /// Absolute location inside the staging root
    pub staged_path: PathBuf,

    /// File size in bytes
    pub size: u64,

    /// Blake3 content hash (computed lazily by the differencer)
    pub hash: Option<ContentHash>,
}

impl StagedEntry {
    /// Create a new StagedEntry without a hash
    pub fn new(relative_path: PathBuf, staged_path: PathBuf, size: u64) -> Self {
        Self {
            relative_path,
            staged_path,
            size,
            hash: None,
        }
    }

    /// Return the cached hash, computing it from disk on first use
    pub fn content_hash(&mut self) -> Result<ContentHash, MirrorError> {
        if let Some(hash) = self.hash {
            return Ok(hash);
        }
        let hash = compute_hash(&self.staged_path)
            .map_err(|e| MirrorError::file_sync(&self.relative_path, e))?;
        self.hash = Some(hash);
        Ok(hash)
    }
}

/// A file in the persistent mirror directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEntry {
    /// Relative path from the target root
    pub relative_path: PathBuf,

    /// Absolute location inside the target root
    pub target_path: PathBuf,
}

impl TargetEntry {
    /// Look up the target counterpart of `relative_path`
    ///
    /// Returns `Ok(None)` when nothing exists at that path. A directory sitting
    /// where a file is expected is reported as a per-file error.
    pub fn lookup(target_root: &Path, relative_path: &Path) -> Result<Option<Self>, MirrorError> {
        let target_path = target_root.join(relative_path);
        match std::fs::symlink_metadata(&target_path) {
            Ok(meta) if meta.is_dir() => Err(MirrorError::PathConflict {
                path: relative_path.to_path_buf(),
            }),
            Ok(_) => Ok(Some(Self {
                relative_path: relative_path.to_path_buf(),
                target_path,
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MirrorError::file_sync(relative_path, e)),
        }
    }

    /// Hash the current on-disk content
    pub fn content_hash(&self) -> Result<ContentHash, MirrorError> {
        compute_hash(&self.target_path).map_err(|e| MirrorError::file_sync(&self.relative_path, e))
    }
}
