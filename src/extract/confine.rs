//! Staging-root confinement for archive entry names

use crate::types::MirrorError;
use std::path::{Component, Path, PathBuf};

/// Resolve `entry_name` under `root` and prove it stays there
///
/// `root` must already be canonical. The entry is joined onto the root,
/// normalized lexically, and then its deepest existing ancestor is
/// canonicalized so that symlinks already on disk are followed. The result
/// must be a strict descendant of `root`; anything else is blocked.
pub fn confine(root: &Path, entry_name: &str) -> Result<PathBuf, MirrorError> {
    let blocked = || MirrorError::PathTraversalBlocked {
        entry: entry_name.to_string(),
    };

    if entry_name.is_empty() || entry_name.contains('\0') {
        return Err(blocked());
    }

    let joined = root.join(entry_name);
    let normalized = normalize(&joined);
    let resolved = resolve_existing_prefix(&normalized).map_err(|_| blocked())?;

    if resolved != root && resolved.starts_with(root) {
        Ok(resolved)
    } else {
        Err(blocked())
    }
}

/// Apply `.` and `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Canonicalize the longest existing ancestor and re-append the rest
fn resolve_existing_prefix(path: &Path) -> std::io::Result<PathBuf> {
    let mut existing = path.to_path_buf();
    let mut tail = Vec::new();

    while std::fs::symlink_metadata(&existing).is_err() {
        match existing.file_name() {
            Some(name) => tail.push(name.to_os_string()),
            None => break,
        }
        if !existing.pop() {
            break;
        }
    }

    let mut resolved = dunce::canonicalize(&existing)?;
    for part in tail.into_iter().rev() {
        resolved.push(part);
    }
    Ok(resolved)
}
