//! Plain-English error summary for the end of a run

use crate::types::MirrorError;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Examples shown per error kind before collapsing the rest
const EXAMPLES_PER_KIND: usize = 3;

/// One per-file error, already humanized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub kind: &'static str,
    pub path: Option<PathBuf>,
    pub message: String,
    pub suggestion: Option<String>,
}

impl ErrorRecord {
    pub fn new(path: Option<&Path>, error: &MirrorError) -> Self {
        let (message, suggestion) = humanize_error(error);
        Self {
            kind: error.kind_label(),
            path: path.map(PathBuf::from),
            message,
            suggestion,
        }
    }
}

fn humanize_error(error: &MirrorError) -> (String, Option<String>) {
    if let Some(io) = error.io_source() {
        if error.is_disk_space_error() {
            return (
                "Not enough disk space to complete operation".to_string(),
                Some("Free disk space in the mirror directory and rerun.".to_string()),
            );
        }
        return match io.kind() {
            ErrorKind::NotFound => (
                "File or directory was not found".to_string(),
                Some("Verify the path still exists and rerun.".to_string()),
            ),
            ErrorKind::PermissionDenied => (
                "Permission denied while accessing file".to_string(),
                Some("Check permissions on the mirror directory.".to_string()),
            ),
            ErrorKind::AlreadyExists => (
                "Destination already exists and was left untouched".to_string(),
                Some("Rerun the sync; a fresh location is picked each time.".to_string()),
            ),
            ErrorKind::WriteZero | ErrorKind::UnexpectedEof => (
                "File copy was interrupted before completion".to_string(),
                Some("Rerun the sync; completed files are skipped.".to_string()),
            ),
            _ => (format!("I/O operation failed: {}", io), None),
        };
    }

    match error {
        MirrorError::PathConflict { .. } => (
            "A file and a directory collide at this path".to_string(),
            Some("Remove or rename the conflicting path in the mirror, then rerun.".to_string()),
        ),
        MirrorError::ReservedPath { .. } => (
            "Path lies inside the version archive and was not written".to_string(),
            None,
        ),
        MirrorError::PathTraversalBlocked { entry } => (
            format!("Archive entry escapes the staging directory: {}", entry),
            None,
        ),
        other => (other.to_string(), None),
    }
}

/// Group records by kind, with at most three examples each
pub fn format_error_summary(records: &[ErrorRecord]) -> String {
    let mut groups: BTreeMap<&'static str, Vec<&ErrorRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.kind).or_default().push(record);
    }

    let mut lines = Vec::new();
    lines.push("Error summary:".to_string());
    for (kind, items) in groups {
        lines.push(format!("  {} ({}):", kind, items.len()));
        for record in items.iter().take(EXAMPLES_PER_KIND) {
            lines.push(format!("    - {}", record.message));
            if let Some(path) = &record.path {
                lines.push(format!("      Path: {}", path.display()));
            }
            if let Some(suggestion) = &record.suggestion {
                lines.push(format!("      Try: {}", suggestion));
            }
        }
        if items.len() > EXAMPLES_PER_KIND {
            lines.push(format!("    - ... {} more", items.len() - EXAMPLES_PER_KIND));
        }
    }
    lines.join("\n")
}
