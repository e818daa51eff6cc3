//! Hashing utilities

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// 32-byte Blake3 digest of a file's content
pub type ContentHash = [u8; 32];

/// Read buffer size; memory use stays bounded regardless of file size.
const CHUNK_SIZE: usize = 64 * 1024;

/// Compute the Blake3 hash of a file
///
/// The file is streamed in 64KB chunks.
///
/// # Example
/// ```no_run
/// use dropmirror::hash::compute_hash;
/// use std::path::Path;
///
/// let hash = compute_hash(Path::new("file.txt"))?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn compute_hash(file_path: &Path) -> io::Result<ContentHash> {
    let file = File::open(file_path)?;
    hash_reader(file)
}

/// Hash everything readable from `reader`
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<ContentHash> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(*hasher.finalize().as_bytes())
}

/// Lowercase hex rendering, as stored in the archive manifest
pub fn to_hex(hash: &ContentHash) -> String {
    blake3::Hash::from(*hash).to_hex().to_string()
}
