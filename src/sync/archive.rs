//! Archive store for replaced files
//!
//! Before a target file is overwritten its current content is copied under
//! `TARGET_DIR/.old_versions/<relative path>`. An archive copy is never
//! overwritten: when the plain slot is taken the copy gets a local-time
//! suffix (`<name>.<YYYYmmdd-HHMMSS>`), and when that is taken too a counter
//! (`-1`, `-2`, ...) is appended. Each archived file is recorded in
//! `.old_versions/MANIFEST.json`; the copy on disk is what counts, so a
//! manifest that cannot be updated is logged and left behind.

use crate::hash::{compute_hash, to_hex};
use crate::sync::copy::{copy_file_no_clobber, write_atomically};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use tracing::warn;

/// Directory under the target root holding archived versions
pub const ARCHIVE_DIR_NAME: &str = ".old_versions";

/// Manifest file inside the archive directory
pub const MANIFEST_FILE_NAME: &str = "MANIFEST.json";

/// True when `relative_path` points into the archive directory
///
/// `.` components are ignored; `..` is not resolved, callers pass confined
/// paths.
pub fn is_archive_path(relative_path: &Path) -> bool {
    let mut components = relative_path
        .components()
        .filter(|c| !matches!(c, Component::CurDir));
    matches!(components.next(), Some(Component::Normal(first)) if first == ARCHIVE_DIR_NAME)
}

/// One archived pre-replace copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedFile {
    /// Relative path of the replaced file in the mirror
    pub original_path: String,
    /// Relative path of the copy inside `.old_versions`
    pub archive_path: String,
    /// RFC 3339 timestamp of the archive operation
    pub archived_at: String,
    /// Size in bytes
    pub size: u64,
    /// Blake3 hex digest of the archived content
    pub hash: String,
}

/// All archived copies, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveManifest {
    pub files: Vec<ArchivedFile>,
}

/// `.old_versions` directory of one mirror
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    root: PathBuf,
}

impl ArchiveStore {
    pub fn new(target_root: &Path) -> Self {
        Self {
            root: target_root.join(ARCHIVE_DIR_NAME),
        }
    }

    /// Absolute path of the archive directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE_NAME)
    }

    /// First free archive location for `relative_path`
    pub fn slot_for(&self, relative_path: &Path, now: &DateTime<Local>) -> PathBuf {
        let plain = self.root.join(relative_path);
        if self.is_free(&plain) {
            return plain;
        }

        let stamp = now.format("%Y%m%d-%H%M%S").to_string();
        let stamped = with_suffix(&plain, &stamp);
        if self.is_free(&stamped) {
            return stamped;
        }

        let mut counter = 1u32;
        loop {
            let candidate = with_suffix(&plain, &format!("{}-{}", stamp, counter));
            if self.is_free(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Copy the current content of `target_path` into the archive
    ///
    /// The target itself is left untouched. Returns the archive location
    /// once the copy is saved; a failed manifest update only logs a warning.
    pub fn archive(&self, relative_path: &Path, target_path: &Path) -> io::Result<PathBuf> {
        self.archive_at(relative_path, target_path, &Local::now())
    }

    /// [`archive`](Self::archive) with an explicit clock
    pub fn archive_at(
        &self,
        relative_path: &Path,
        target_path: &Path,
        now: &DateTime<Local>,
    ) -> io::Result<PathBuf> {
        let slot = self.slot_for(relative_path, now);
        let size = copy_file_no_clobber(target_path, &slot)?;
        let hash = compute_hash(&slot)?;

        let archive_path = slot
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| slot.clone());

        let recorded = self.record(
            ArchivedFile {
                original_path: relative_path.to_string_lossy().to_string(),
                archive_path: archive_path.to_string_lossy().to_string(),
                archived_at: now.to_rfc3339(),
                size,
                hash: to_hex(&hash),
            },
            now,
        );
        if let Err(e) = recorded {
            warn!(
                "Archived {} but could not update {}: {}",
                archive_path.display(),
                MANIFEST_FILE_NAME,
                e
            );
        }

        Ok(slot)
    }

    /// Read the manifest; a missing manifest is empty
    pub fn load_manifest(&self) -> io::Result<ArchiveManifest> {
        match fs::read_to_string(self.manifest_path()) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                io::Error::new(
                    ErrorKind::InvalidData,
                    format!("Failed to parse {}: {}", MANIFEST_FILE_NAME, e),
                )
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ArchiveManifest::default()),
            Err(e) => Err(e),
        }
    }

    // Manifest writes use a read-modify-write flow; runs are not concurrent.
    fn record(&self, file: ArchivedFile, now: &DateTime<Local>) -> io::Result<()> {
        let mut manifest = match self.load_manifest() {
            Ok(manifest) => manifest,
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                let kept = self.set_aside_manifest(now)?;
                warn!("{}; kept it as {} and started a new one", e, kept.display());
                ArchiveManifest::default()
            }
            Err(e) => return Err(e),
        };
        manifest.files.push(file);

        let json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;
        write_atomically(&self.manifest_path(), |out| {
            out.write_all(&json)?;
            Ok(json.len() as u64)
        })?;
        Ok(())
    }

    /// Move an unreadable manifest to `MANIFEST.json.corrupt-<stamp>[-N]`
    fn set_aside_manifest(&self, now: &DateTime<Local>) -> io::Result<PathBuf> {
        let manifest = self.manifest_path();
        let stamp = format!("corrupt-{}", now.format("%Y%m%d-%H%M%S"));
        let mut candidate = with_suffix(&manifest, &stamp);
        let mut counter = 1u32;
        while fs::symlink_metadata(&candidate).is_ok() {
            candidate = with_suffix(&manifest, &format!("{}-{}", stamp, counter));
            counter += 1;
        }
        fs::rename(&manifest, &candidate)?;
        Ok(candidate)
    }

    fn is_free(&self, candidate: &Path) -> bool {
        candidate != self.manifest_path() && fs::symlink_metadata(candidate).is_err()
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
