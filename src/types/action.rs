//! ChangeDecision - classification of one staged file against the target

use std::path::PathBuf;

/// What the synchronizer must do with a staged file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    /// No file at that path in the target
    Create,

    /// Target file exists with different content
    Replace,

    /// Hashes match; nothing to do
    Unchanged,
}

impl ChangeAction {
    /// Label used in log lines and progress messages
    pub fn label(&self, dry_run: bool) -> &'static str {
        match (self, dry_run) {
            (ChangeAction::Create, false) => "COPY",
            (ChangeAction::Create, true) => "DRY-COPY",
            (ChangeAction::Replace, false) => "UPDATE",
            (ChangeAction::Replace, true) => "DRY-UPDATE",
            (ChangeAction::Unchanged, _) => "SKIP",
        }
    }
}

/// Decision computed once per staged entry per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDecision {
    pub action: ChangeAction,

    /// Relative path shared by the staged file and its target
    pub relative_path: PathBuf,

    /// Staged absolute location
    pub source: PathBuf,

    /// Target absolute location
    pub destination: PathBuf,

    /// Staged file size in bytes
    pub size: u64,
}

impl ChangeDecision {
    pub fn is_create(&self) -> bool {
        self.action == ChangeAction::Create
    }

    pub fn is_replace(&self) -> bool {
        self.action == ChangeAction::Replace
    }

    pub fn is_unchanged(&self) -> bool {
        self.action == ChangeAction::Unchanged
    }
}
