//! Error types for dropmirror

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error types for mirror runs
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Missing or invalid settings; the run never starts
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote archive could not be retrieved
    #[error("Download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    /// Archive is corrupt/unreadable or the staging directory is unwritable
    #[error("Extraction failed for {archive}: {reason}")]
    Extraction { archive: PathBuf, reason: String },

    /// Archive entry would resolve outside the staging root
    #[error("Blocked archive entry escaping staging root: {entry}")]
    PathTraversalBlocked { entry: String },

    /// A directory in the mirror sits where a staged file should go
    #[error("A directory exists where {path} should be a file")]
    PathConflict { path: PathBuf },

    /// Path inside the archive store; only the synchronizer writes there
    #[error("Refusing to write into the version archive: {path}")]
    ReservedPath { path: PathBuf },

    /// Per-file failure while diffing or syncing
    #[error("Failed to sync {path}: {source}")]
    FileSync {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A directory required before the run could not be created
    #[error("Could not create directory {path}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MirrorError {
    /// Wrap an IO error raised while handling a single file
    pub fn file_sync(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        MirrorError::FileSync {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Check if this error is related to permissions
    pub fn is_permission_error(&self) -> bool {
        self.io_kind() == Some(ErrorKind::PermissionDenied)
    }

    /// Check if this error is related to disk space
    pub fn is_disk_space_error(&self) -> bool {
        match self.io_source() {
            Some(e) => {
                e.kind() == ErrorKind::StorageFull || matches!(e.raw_os_error(), Some(28 | 122))
            }
            None => false,
        }
    }

    /// Process exit status for a run that ended with this error
    pub fn exit_code(&self) -> u8 {
        match self {
            MirrorError::Extraction { .. } => 2,
            MirrorError::DirectoryCreation { .. } => 3,
            _ => 1,
        }
    }

    /// Short label used when grouping errors in the final report
    pub fn kind_label(&self) -> &'static str {
        if self.is_permission_error() {
            return "Permission denied";
        }
        if self.is_disk_space_error() {
            return "Disk full";
        }
        match self {
            MirrorError::Config(_) => "Configuration error",
            MirrorError::Download { .. } => "Download error",
            MirrorError::Extraction { .. } => "Extraction error",
            MirrorError::PathTraversalBlocked { .. } => "Blocked entry",
            MirrorError::PathConflict { .. } => "Path conflict",
            MirrorError::ReservedPath { .. } => "Reserved path",
            MirrorError::FileSync { .. } => "File sync error",
            MirrorError::DirectoryCreation { .. } => "Directory creation error",
        }
    }

    /// Underlying IO error, if any
    pub fn io_source(&self) -> Option<&std::io::Error> {
        match self {
            MirrorError::FileSync { source, .. } | MirrorError::DirectoryCreation { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }

    fn io_kind(&self) -> Option<ErrorKind> {
        self.io_source().map(|e| e.kind())
    }
}
