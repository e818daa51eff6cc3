#![allow(dead_code)]

use dropmirror::fetch::ArchiveFetcher;
use dropmirror::sync::write_atomically;
use dropmirror::{MirrorError, Settings};
use indicatif::ProgressBar;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Write a zip with the given entries; names ending in `/` are directories
pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).expect("create zip");
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).expect("add zip directory");
            continue;
        }
        zip.start_file(*name, options).expect("start zip entry");
        zip.write_all(content).expect("write zip entry");
    }
    zip.finish().expect("finish zip");
}

/// Write a zip holding one regular file and one symlink entry
pub fn write_zip_with_symlink(path: &Path, file: (&str, &[u8]), link: (&str, &str)) {
    let out = File::create(path).expect("create zip");
    let mut zip = ZipWriter::new(out);
    let options = SimpleFileOptions::default();
    zip.start_file(file.0, options).expect("start zip entry");
    zip.write_all(file.1).expect("write zip entry");
    zip.add_symlink(link.0, link.1, options).expect("add symlink");
    zip.finish().expect("finish zip");
}

/// Serves a local file as if it were the remote archive
pub struct LocalFetcher {
    pub source: PathBuf,
}

impl ArchiveFetcher for LocalFetcher {
    fn fetch(&self, url: &str, dest: &Path, _progress: &ProgressBar) -> Result<u64, MirrorError> {
        write_atomically(dest, |out| {
            let mut input = File::open(&self.source)?;
            io::copy(&mut input, out)
        })
        .map_err(|e| MirrorError::Download {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Always fails like an unreachable server
pub struct UnreachableFetcher;

impl ArchiveFetcher for UnreachableFetcher {
    fn fetch(&self, url: &str, _dest: &Path, _progress: &ProgressBar) -> Result<u64, MirrorError> {
        Err(MirrorError::Download {
            url: url.to_string(),
            reason: "could not connect".to_string(),
        })
    }
}

/// Settings rooted in `base`, with mirror, download and log under it
pub fn settings_in(base: &Path) -> Settings {
    let mut settings = Settings::with_defaults("https://example.com/share/folder.zip", base);
    settings.target_dir = base.join("mirror");
    settings.download_path = base.join("downloads/latest.zip");
    settings.log_path = base.join("logs/sync.log");
    settings
}

/// Relative path -> content for every regular file under `root`
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut out = BTreeMap::new();
    collect(root, root, &mut out);
    out
}

fn collect(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(root, &path, out);
        } else {
            let rel = path.strip_prefix(root).expect("under root").to_path_buf();
            out.insert(rel, fs::read(&path).expect("read file"));
        }
    }
}

/// One-shot HTTP server answering the first request with `response`
///
/// Returns the base URL and the server thread.
pub fn serve_once(response: Vec<u8>) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
    let addr = listener.local_addr().expect("server address");

    let handle = thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let _ = stream.write_all(&response);
            let _ = stream.flush();
        }
    });

    (format!("http://{}", addr), handle)
}

/// A complete `200 OK` response carrying `body`
pub fn ok_response(body: &[u8]) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/zip\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}
