//! Run-scoped logging
//!
//! Each run installs its own subscriber for the current thread: one layer
//! prints to the terminal (around the progress bars), the other appends
//! plain-text lines to `LOG_PATH`. Dropping the [`LogSession`] uninstalls
//! the subscriber and syncs the log file.

mod writer;

pub use writer::IndicatifWriter;

use crate::types::MirrorError;
use indicatif::MultiProgress;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the log filter
pub const LOG_ENV_VAR: &str = "DROPMIRROR_LOG";

/// Active logging for one run
pub struct LogSession {
    _guard: DefaultGuard,
    file: Arc<File>,
}

impl LogSession {
    /// Open `log_path` for appending and install the run subscriber
    pub fn start(
        log_path: &Path,
        verbose: bool,
        progress: &MultiProgress,
    ) -> Result<Self, MirrorError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .map_err(|source| MirrorError::DirectoryCreation {
                path: log_path.to_path_buf(),
                source,
            })?;
        let file = Arc::new(file);

        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .without_time()
            .with_writer(IndicatifWriter::new(progress.clone()));

        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(Arc::clone(&file));

        let subscriber = tracing_subscriber::registry()
            .with(env_filter(verbose))
            .with(console_layer)
            .with(file_layer);

        Ok(Self {
            _guard: tracing::subscriber::set_default(subscriber),
            file,
        })
    }

    /// Flush the log file to disk
    pub fn sync(&self) {
        if let Err(e) = self.file.sync_all() {
            eprintln!("warning: could not sync log file: {}", e);
        }
    }
}

impl Drop for LogSession {
    fn drop(&mut self) {
        self.sync();
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    let default = if verbose {
        "info,dropmirror=debug"
    } else {
        "info"
    };
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default))
}
