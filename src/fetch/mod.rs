//! Remote archive retrieval
//!
//! The download is streamed into a temporary file next to the destination and
//! renamed into place only once complete, so an interrupted transfer never
//! leaves a truncated archive at `DOWNLOAD_PATH`.

use crate::sync::write_atomically;
use crate::types::MirrorError;
use crate::ui::download_bar_style;
use indicatif::ProgressBar;
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Default connect timeout for the HTTP fetcher
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default per-read timeout for the HTTP fetcher
pub const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Retrieves the archive behind `url` into `dest`
///
/// Implementations must replace `dest` atomically and return the number of
/// bytes written.
pub trait ArchiveFetcher {
    fn fetch(&self, url: &str, dest: &Path, progress: &ProgressBar) -> Result<u64, MirrorError>;
}

/// Blocking HTTP(S) fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
            read_timeout: READ_TIMEOUT,
        }
    }

    /// Override both timeouts
    pub fn with_timeouts(mut self, connect_timeout: Duration, read_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.read_timeout = read_timeout;
        self
    }

    fn client(&self, url: &str) -> Result<reqwest::blocking::Client, MirrorError> {
        reqwest::blocking::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.read_timeout)
            .user_agent(concat!("dropmirror/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| download_error(url, e.to_string()))
    }
}

impl ArchiveFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path, progress: &ProgressBar) -> Result<u64, MirrorError> {
        info!("Downloading {} -> {}", url, dest.display());

        let client = self.client(url)?;
        let mut response = client
            .get(url)
            .send()
            .map_err(|e| download_error(url, describe_reqwest_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(download_error(url, format!("server responded {}", status)));
        }

        if let Some(len) = response.content_length() {
            if let Some(style) = download_bar_style() {
                progress.set_style(style);
            }
            progress.set_length(len);
        }
        debug!(
            content_length = ?response.content_length(),
            "Response headers received"
        );

        let bytes = write_atomically(dest, |file| {
            let mut writer = progress.wrap_write(file);
            io::copy(&mut response, &mut writer)
        })
        .map_err(|e| download_error(url, e.to_string()))?;

        progress.finish_and_clear();
        info!("Download finished ({} bytes)", bytes);
        Ok(bytes)
    }
}

fn download_error(url: &str, reason: String) -> MirrorError {
    MirrorError::Download {
        url: url.to_string(),
        reason,
    }
}

fn describe_reqwest_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("timed out: {}", error)
    } else if error.is_connect() {
        format!("could not connect: {}", error)
    } else {
        error.to_string()
    }
}
