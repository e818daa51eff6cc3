//! Differencer - hashes staged files and classifies them against the mirror
//!
//! Only staged files are classified. Files that exist solely in the mirror are
//! never looked at, so nothing is ever scheduled for deletion.

mod compare;
mod plan;

pub use compare::compare_entry;
pub use plan::{DiffPlan, PlanStats};

use crate::sync::is_archive_path;
use crate::types::{ChangeDecision, MirrorError, StagedEntry, TargetEntry};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Classifies staged entries against one target directory
#[derive(Debug, Clone)]
pub struct Differencer {
    target_root: PathBuf,
}

impl Differencer {
    pub fn new(target_root: &Path) -> Self {
        Self {
            target_root: target_root.to_path_buf(),
        }
    }

    /// Classify a single staged entry
    ///
    /// Paths inside `.old_versions` are refused; that tree belongs to the
    /// archive store.
    pub fn classify(&self, mut staged: StagedEntry) -> Result<ChangeDecision, MirrorError> {
        if is_archive_path(&staged.relative_path) {
            return Err(MirrorError::ReservedPath {
                path: staged.relative_path,
            });
        }

        let target = TargetEntry::lookup(&self.target_root, &staged.relative_path)?;
        let action = compare_entry(&mut staged, target.as_ref())?;

        let destination = target
            .map(|t| t.target_path)
            .unwrap_or_else(|| self.target_root.join(&staged.relative_path));

        debug!("{:?}: {}", action, staged.relative_path.display());
        Ok(ChangeDecision {
            action,
            relative_path: staged.relative_path,
            source: staged.staged_path,
            destination,
            size: staged.size,
        })
    }

    /// Lazily classify a stream of staged entries, preserving its order
    pub fn decisions<'a, I>(
        &'a self,
        entries: I,
    ) -> impl Iterator<Item = Result<ChangeDecision, (PathBuf, MirrorError)>> + 'a
    where
        I: IntoIterator<Item = StagedEntry>,
        I::IntoIter: 'a,
    {
        entries.into_iter().map(move |entry| {
            let path = entry.relative_path.clone();
            self.classify(entry).map_err(|e| (path, e))
        })
    }

    /// Classify every staged entry up front
    ///
    /// Per-file failures are collected in the plan instead of aborting.
    pub fn plan<I>(&self, entries: I) -> DiffPlan
    where
        I: IntoIterator<Item = StagedEntry>,
    {
        let mut plan = DiffPlan::new();
        for result in self.decisions(entries) {
            match result {
                Ok(decision) => plan.add_decision(decision),
                Err((path, error)) => plan.add_failure(path, error),
            }
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChangeAction;
    use std::fs;
    use tempfile::TempDir;

    fn stage_file(root: &Path, rel: &str, content: &[u8]) -> StagedEntry {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create stage parent");
        }
        fs::write(&path, content).expect("write staged file");
        StagedEntry::new(PathBuf::from(rel), path, content.len() as u64)
    }

    #[test]
    fn test_classify_sets_destination_under_target() {
        let stage = TempDir::new().expect("create stage");
        let mirror = TempDir::new().expect("create mirror");
        let entry = stage_file(stage.path(), "sub/a.txt", b"x");

        let decision = Differencer::new(mirror.path())
            .classify(entry)
            .expect("classify");

        assert_eq!(decision.action, ChangeAction::Create);
        assert_eq!(decision.destination, mirror.path().join("sub/a.txt"));
        assert_eq!(decision.source, stage.path().join("sub/a.txt"));
    }

    #[test]
    fn test_plan_keeps_order_and_collects_failures() {
        let stage = TempDir::new().expect("create stage");
        let mirror = TempDir::new().expect("create mirror");
        fs::create_dir_all(mirror.path().join("b.txt")).expect("directory in the way");

        let entries = vec![
            stage_file(stage.path(), "a.txt", b"a"),
            stage_file(stage.path(), "b.txt", b"b"),
            stage_file(stage.path(), "c.txt", b"c"),
        ];
        let plan = Differencer::new(mirror.path()).plan(entries);

        let paths: Vec<_> = plan
            .decisions
            .iter()
            .map(|d| d.relative_path.clone())
            .collect();
        assert_eq!(paths, vec![PathBuf::from("a.txt"), PathBuf::from("c.txt")]);
        assert_eq!(plan.failures.len(), 1);
        assert_eq!(plan.failures[0].0, PathBuf::from("b.txt"));
        assert_eq!(plan.stats.failed_count, 1);
    }

    #[test]
    fn test_archive_dir_paths_are_refused() {
        let stage = TempDir::new().expect("create stage");
        let mirror = TempDir::new().expect("create mirror");
        fs::create_dir_all(mirror.path().join(".old_versions")).expect("create archive dir");
        fs::write(mirror.path().join(".old_versions/notes.txt"), b"v1").expect("write archive");

        let entry = stage_file(stage.path(), ".old_versions/notes.txt", b"EVIL");
        let err = Differencer::new(mirror.path()).classify(entry).unwrap_err();

        assert!(matches!(err, MirrorError::ReservedPath { .. }));
    }

    #[test]
    fn test_decisions_are_lazy() {
        let stage = TempDir::new().expect("create stage");
        let mirror = TempDir::new().expect("create mirror");
        let differ = Differencer::new(mirror.path());

        let entries = vec![
            stage_file(stage.path(), "a.txt", b"a"),
            StagedEntry::new(
                PathBuf::from("never.txt"),
                stage.path().join("never.txt"),
                1,
            ),
        ];

        // Only the first entry is pulled, so the missing second file is never hashed.
        let first = differ.decisions(entries).next().expect("one decision");
        assert!(first.is_ok());
    }
}
