//! Synchronizer: applies change decisions to the mirror

pub mod archive;
pub mod copy;

pub use archive::{
    is_archive_path, ArchiveManifest, ArchiveStore, ArchivedFile, ARCHIVE_DIR_NAME,
    MANIFEST_FILE_NAME,
};
pub use copy::{copy_file_atomic, copy_file_no_clobber, is_part_file, write_atomically, PART_SUFFIX};

use crate::types::{ChangeAction, ChangeDecision, MirrorError, RunSummary};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A `Progress` event is emitted after every this many decisions
pub const PROGRESS_INTERVAL: usize = 25;

/// Events emitted while applying decisions
#[derive(Debug)]
pub enum SyncEvent<'a> {
    /// Decision applied (or, in dry-run, accounted for)
    Applied {
        index: usize,
        total: usize,
        decision: &'a ChangeDecision,
        /// Archive location of the pre-replace content; in dry-run the
        /// location that would have been used
        archived_to: Option<PathBuf>,
    },
    /// Decision failed; the synchronizer moved on to the next one
    Failed {
        index: usize,
        total: usize,
        decision: &'a ChangeDecision,
        /// Archive copy saved before the failing step, if any
        archived_to: Option<PathBuf>,
        error: &'a MirrorError,
    },
    /// Periodic progress notification
    Progress { processed: usize, total: usize },
    /// All decisions handled
    Complete { summary: RunSummary },
}

/// Optional callback used to receive sync events.
pub type SyncCallback<'a> = dyn Fn(&SyncEvent<'_>) + 'a;

/// Applies [`ChangeDecision`]s to one target directory
#[derive(Debug, Clone)]
pub struct Synchronizer {
    target_root: PathBuf,
    keep_versions: bool,
    dry_run: bool,
    archive: ArchiveStore,
}

impl Synchronizer {
    pub fn new(target_root: &Path, keep_versions: bool, dry_run: bool) -> Self {
        Self {
            target_root: target_root.to_path_buf(),
            keep_versions,
            dry_run,
            archive: ArchiveStore::new(target_root),
        }
    }

    /// Remove `.mirror-part` leftovers of an interrupted earlier run
    ///
    /// Does nothing in dry-run. Returns the number of files removed.
    pub fn sweep_stale_parts(&self) -> usize {
        if self.dry_run || !self.target_root.is_dir() {
            return 0;
        }

        let archive_root = self.archive.root().to_path_buf();
        let walker = ignore::WalkBuilder::new(&self.target_root)
            .standard_filters(false)
            .follow_links(false)
            .filter_entry(move |entry| entry.path() != archive_root)
            .build();

        let mut removed = 0;
        for entry in walker.filter_map(Result::ok) {
            let is_file = entry.file_type().is_some_and(|t| t.is_file());
            if !is_file || !is_part_file(entry.path()) {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => {
                    debug!("Removed stale temp file {}", entry.path().display());
                    removed += 1;
                }
                Err(e) => warn!(
                    "Could not remove stale temp file {}: {}",
                    entry.path().display(),
                    e
                ),
            }
        }
        removed
    }

    /// Apply every decision in order
    ///
    /// Per-file failures are reported through `on_event` and counted in the
    /// returned summary; they never stop the remaining decisions.
    pub fn apply(
        &self,
        decisions: &[ChangeDecision],
        on_event: Option<&SyncCallback<'_>>,
    ) -> RunSummary {
        let total = decisions.len();
        let mut summary = RunSummary::default();

        for (idx, decision) in decisions.iter().enumerate() {
            let index = idx + 1;

            let (archived_to, result) = self.apply_one(decision);
            if archived_to.is_some() {
                summary.archived += 1;
            }

            match result {
                Ok(()) => {
                    let bytes = if decision.is_unchanged() { 0 } else { decision.size };
                    summary.record(decision.action, bytes);
                    emit_event(
                        on_event,
                        SyncEvent::Applied {
                            index,
                            total,
                            decision,
                            archived_to,
                        },
                    );
                }
                Err(error) => {
                    summary.record_error();
                    emit_event(
                        on_event,
                        SyncEvent::Failed {
                            index,
                            total,
                            decision,
                            archived_to,
                            error: &error,
                        },
                    );
                }
            }

            if index % PROGRESS_INTERVAL == 0 || index == total {
                emit_event(
                    on_event,
                    SyncEvent::Progress {
                        processed: index,
                        total,
                    },
                );
            }
        }

        emit_event(on_event, SyncEvent::Complete { summary });
        summary
    }

    /// Apply one decision
    ///
    /// A saved archive copy is returned even when the replace itself fails.
    fn apply_one(&self, decision: &ChangeDecision) -> (Option<PathBuf>, Result<(), MirrorError>) {
        if is_archive_path(&decision.relative_path) {
            let error = MirrorError::ReservedPath {
                path: decision.relative_path.clone(),
            };
            return (None, Err(error));
        }

        match decision.action {
            ChangeAction::Unchanged => (None, Ok(())),
            ChangeAction::Create => (None, self.copy_into_place(decision)),
            ChangeAction::Replace => {
                let archived_to = if !self.keep_versions {
                    None
                } else if self.dry_run {
                    Some(
                        self.archive
                            .slot_for(&decision.relative_path, &chrono::Local::now()),
                    )
                } else {
                    match self
                        .archive
                        .archive(&decision.relative_path, &decision.destination)
                    {
                        Ok(slot) => Some(slot),
                        Err(e) => {
                            return (None, Err(MirrorError::file_sync(&decision.relative_path, e)))
                        }
                    }
                };
                (archived_to, self.copy_into_place(decision))
            }
        }
    }

    fn copy_into_place(&self, decision: &ChangeDecision) -> Result<(), MirrorError> {
        if self.dry_run {
            return Ok(());
        }
        copy_file_atomic(&decision.source, &decision.destination)
            .map(|_| ())
            .map_err(|e| MirrorError::file_sync(&decision.relative_path, e))
    }
}

fn emit_event(on_event: Option<&SyncCallback<'_>>, event: SyncEvent<'_>) {
    if let Some(callback) = on_event {
        callback(&event);
    }
}
