//! Atomic file writes
//!
//! Every write into the mirror goes through a hidden sibling temp file that is
//! flushed, fsynced and then renamed over the destination, so a crash never
//! leaves a half-written file under its real name.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Suffix of in-flight temp files; leftovers from interrupted runs carry it
pub const PART_SUFFIX: &str = ".mirror-part";

const COPY_BUFFER_SIZE: usize = 128 * 1024;

/// Stream content into a temp file beside `dest`, then rename it over `dest`
///
/// Parent directories are created as needed. The temp file is removed if
/// `fill` fails.
pub fn write_atomically<F>(dest: &Path, fill: F) -> io::Result<u64>
where
    F: FnOnce(&mut File) -> io::Result<u64>,
{
    let (temp, bytes) = fill_temp_sibling(dest, fill)?;
    temp.persist(dest).map_err(|e| e.error)?;
    Ok(bytes)
}

/// Copy `src` to `dest` atomically, preserving permissions and mtime
///
/// # Example
/// ```no_run
/// use dropmirror::sync::copy_file_atomic;
/// use std::path::Path;
///
/// let bytes = copy_file_atomic(Path::new("staged/a.txt"), Path::new("mirror/a.txt"))?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn copy_file_atomic(src: &Path, dest: &Path) -> io::Result<u64> {
    write_atomically(dest, |file| copy_contents(src, file))
}

/// Like [`copy_file_atomic`], but fails with `AlreadyExists` instead of
/// replacing an existing `dest`
pub fn copy_file_no_clobber(src: &Path, dest: &Path) -> io::Result<u64> {
    let (temp, bytes) = fill_temp_sibling(dest, |file| copy_contents(src, file))?;
    temp.persist_noclobber(dest).map_err(|e| e.error)?;
    Ok(bytes)
}

/// True for temp files created by this module
pub fn is_part_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(PART_SUFFIX))
        .unwrap_or(false)
}

fn fill_temp_sibling<F>(dest: &Path, fill: F) -> io::Result<(NamedTempFile, u64)>
where
    F: FnOnce(&mut File) -> io::Result<u64>,
{
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut prefix = OsString::from(".");
    prefix.push(dest.file_name().unwrap_or_default());
    prefix.push(".");

    let mut temp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(PART_SUFFIX)
        .tempfile_in(parent)?;

    let bytes = fill(temp.as_file_mut())?;
    temp.as_file_mut().flush()?;
    temp.as_file().sync_all()?;

    Ok((temp, bytes))
}

fn copy_contents(src: &Path, out: &mut File) -> io::Result<u64> {
    let src_file = File::open(src)?;
    let src_metadata = src_file.metadata()?;

    let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, src_file);
    let bytes = io::copy(&mut reader, out)?;

    out.set_permissions(src_metadata.permissions())?;
    let mtime = filetime::FileTime::from_last_modification_time(&src_metadata);
    filetime::set_file_handle_times(out, None, Some(mtime))?;

    Ok(bytes)
}
