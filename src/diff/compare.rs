//! Staged-vs-target content comparison

use crate::types::{ChangeAction, MirrorError, StagedEntry, TargetEntry};
use std::fs;

/// Decide what a staged file means for its target counterpart
///
/// 1. **No target**: Create
/// 2. **Size mismatch**: Replace (no need to read the target)
/// 3. **Hash comparison**: Unchanged when the BLAKE3 digests match, else Replace
///
/// The staged hash is always computed and cached on `staged`, so callers can
/// report it even for new files.
pub fn compare_entry(
    staged: &mut StagedEntry,
    target: Option<&TargetEntry>,
) -> Result<ChangeAction, MirrorError> {
    let staged_hash = staged.content_hash()?;

    let Some(target) = target else {
        return Ok(ChangeAction::Create);
    };

    let target_size = fs::metadata(&target.target_path)
        .map_err(|e| MirrorError::file_sync(&target.relative_path, e))?
        .len();
    if target_size != staged.size {
        return Ok(ChangeAction::Replace);
    }

    if target.content_hash()? == staged_hash {
        Ok(ChangeAction::Unchanged)
    } else {
        Ok(ChangeAction::Replace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn staged(dir: &Path, rel: &str, content: &[u8]) -> StagedEntry {
        let path = dir.join(rel);
        fs::write(&path, content).expect("write staged file");
        StagedEntry::new(PathBuf::from(rel), path, content.len() as u64)
    }

    fn target(dir: &Path, rel: &str, content: &[u8]) -> TargetEntry {
        let path = dir.join(rel);
        fs::write(&path, content).expect("write target file");
        TargetEntry {
            relative_path: PathBuf::from(rel),
            target_path: path,
        }
    }

    #[test]
    fn test_missing_target_is_create() {
        let stage = TempDir::new().expect("create stage");
        let mut entry = staged(stage.path(), "a.txt", b"abc");

        assert_eq!(compare_entry(&mut entry, None).unwrap(), ChangeAction::Create);
        assert!(entry.hash.is_some());
    }

    #[test]
    fn test_same_content_is_unchanged() {
        let stage = TempDir::new().expect("create stage");
        let mirror = TempDir::new().expect("create mirror");
        let mut entry = staged(stage.path(), "a.txt", b"same");
        let existing = target(mirror.path(), "a.txt", b"same");

        assert_eq!(
            compare_entry(&mut entry, Some(&existing)).unwrap(),
            ChangeAction::Unchanged
        );
    }

    #[test]
    fn test_same_size_different_content_is_replace() {
        let stage = TempDir::new().expect("create stage");
        let mirror = TempDir::new().expect("create mirror");
        let mut entry = staged(stage.path(), "a.txt", b"aaaa");
        let existing = target(mirror.path(), "a.txt", b"bbbb");

        assert_eq!(
            compare_entry(&mut entry, Some(&existing)).unwrap(),
            ChangeAction::Replace
        );
    }

    #[test]
    fn test_size_mismatch_is_replace() {
        let stage = TempDir::new().expect("create stage");
        let mirror = TempDir::new().expect("create mirror");
        let mut entry = staged(stage.path(), "a.txt", b"short");
        let existing = target(mirror.path(), "a.txt", b"much longer content");

        assert_eq!(
            compare_entry(&mut entry, Some(&existing)).unwrap(),
            ChangeAction::Replace
        );
    }

    #[test]
    fn test_unreadable_staged_file_is_file_sync_error() {
        let mut entry = StagedEntry::new(
            PathBuf::from("gone.txt"),
            PathBuf::from("/nonexistent/stage/gone.txt"),
            1,
        );
        let err = compare_entry(&mut entry, None).unwrap_err();
        assert!(matches!(err, MirrorError::FileSync { .. }));
    }
}
