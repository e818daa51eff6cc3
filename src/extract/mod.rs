//! Archive extraction into an isolated staging directory

mod confine;
mod staged;

pub use confine::confine;
pub use staged::StagedEntries;

use crate::sync::{is_archive_path, ARCHIVE_DIR_NAME};
use crate::types::MirrorError;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

/// Unix file-type bits for a symlink
const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

/// Outcome of a successful extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    /// Regular files written into staging
    pub files: usize,

    /// Entry names rejected by confinement, in archive order
    pub blocked: Vec<String>,

    /// Entry names that resolve into the reserved `.old_versions` directory
    pub reserved: Vec<String>,
}

/// Unpack every entry of the zip at `archive` into `staging_root`
///
/// Entries that would resolve outside the staging root (relative traversal,
/// absolute names, symlink entries or existing symlinks on the way) are
/// logged and skipped. A corrupt archive or an unwritable staging directory
/// is fatal; in that case `staging_root` is removed before returning.
pub fn extract_archive(archive: &Path, staging_root: &Path) -> Result<ExtractReport, MirrorError> {
    info!(
        "Extracting {} -> {}",
        archive.display(),
        staging_root.display()
    );

    match extract_entries(archive, staging_root) {
        Ok(report) => {
            info!(
                "Extracted {} file(s), blocked {} entr(ies), skipped {} reserved",
                report.files,
                report.blocked.len(),
                report.reserved.len()
            );
            Ok(report)
        }
        Err(reason) => {
            if let Err(e) = fs::remove_dir_all(staging_root) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(
                        "Could not remove staging directory {}: {}",
                        staging_root.display(),
                        e
                    );
                }
            }
            Err(MirrorError::Extraction {
                archive: archive.to_path_buf(),
                reason,
            })
        }
    }
}

/// Enumerate the files extracted under `staging_root`
pub fn staged_entries(staging_root: &Path) -> StagedEntries {
    StagedEntries::new(staging_root)
}

fn extract_entries(archive: &Path, staging_root: &Path) -> Result<ExtractReport, String> {
    let file = File::open(archive).map_err(|e| format!("cannot open archive: {}", e))?;
    let mut zip = zip::ZipArchive::new(io::BufReader::new(file))
        .map_err(|e| format!("not a readable zip archive: {}", e))?;

    fs::create_dir_all(staging_root)
        .map_err(|e| format!("cannot create staging directory: {}", e))?;
    let root = dunce::canonicalize(staging_root)
        .map_err(|e| format!("cannot resolve staging directory: {}", e))?;

    let mut report = ExtractReport::default();

    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| format!("corrupt entry #{}: {}", index, e))?;
        let name = entry.name().to_string();

        let is_symlink = entry
            .unix_mode()
            .is_some_and(|mode| mode & S_IFMT == S_IFLNK);
        let resolved = if is_symlink {
            Err(MirrorError::PathTraversalBlocked {
                entry: name.clone(),
            })
        } else {
            confine(&root, &name)
        };

        let dest = match resolved {
            Ok(path) => path,
            Err(err) => {
                warn!("BLOCKED: {} ({})", name, err);
                report.blocked.push(name);
                continue;
            }
        };

        // Checked on the resolved path so `..` cannot reach the reserved name.
        if dest.strip_prefix(&root).is_ok_and(is_archive_path) {
            warn!("Skipping entry under reserved {}/: {}", ARCHIVE_DIR_NAME, name);
            report.reserved.push(name);
            continue;
        }

        if entry.is_dir() {
            fs::create_dir_all(&dest)
                .map_err(|e| format!("cannot create {}: {}", dest.display(), e))?;
            continue;
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("cannot create {}: {}", parent.display(), e))?;
        }

        // Re-check now that the parents exist on disk.
        let still_confined = confine(&root, &name).is_ok_and(|p| p == dest);
        if !still_confined || is_symlink_on_disk(&dest) {
            warn!("BLOCKED: {} (resolves through a link)", name);
            report.blocked.push(name);
            continue;
        }

        let mut out = File::create(&dest)
            .map_err(|e| format!("cannot write {}: {}", dest.display(), e))?;
        io::copy(&mut entry, &mut out)
            .map_err(|e| format!("failed to unpack {}: {}", name, e))?;

        apply_mode(&dest, entry.unix_mode());
        debug!("Staged {}", name);
        report.files += 1;
    }

    Ok(report)
}

fn is_symlink_on_disk(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: Option<u32>) {
    use std::os::unix::fs::PermissionsExt;
    if let Some(mode) = mode {
        // Keep permission bits only, and always leave the owner able to read.
        let perms = fs::Permissions::from_mode((mode & 0o777) | 0o400);
        if let Err(e) = fs::set_permissions(path, perms) {
            debug!("Could not set mode on {}: {}", path.display(), e);
        }
    }
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: Option<u32>) {}
