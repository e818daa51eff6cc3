//! Progress reporting

use crate::sync::{SyncEvent, ARCHIVE_DIR_NAME};
use crate::types::{ChangeAction, MirrorError, RunSummary};
use crate::ui::summary::{format_error_summary, ErrorRecord};
use indicatif::{HumanBytes, MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::cell::RefCell;
use std::fmt::Display;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Style for a download whose size is known
pub fn download_bar_style() -> Option<ProgressStyle> {
    ProgressStyle::with_template(
        "{bar:30.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}",
    )
    .ok()
    .map(|style| style.progress_chars("=>-"))
}

/// Streams run progress to the terminal and the log
///
/// Everything that should land in the log goes through `tracing`; the
/// progress bars are terminal-only.
pub struct Reporter {
    multi: MultiProgress,
    dry_run: bool,
    sync_bar: RefCell<Option<ProgressBar>>,
    errors: RefCell<Vec<ErrorRecord>>,
}

impl Reporter {
    /// Create a reporter drawing to stderr
    pub fn new(dry_run: bool) -> Self {
        Self::with_multi(MultiProgress::new(), dry_run)
    }

    /// Create a reporter with no visible progress bars
    pub fn hidden(dry_run: bool) -> Self {
        Self::with_multi(
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
            dry_run,
        )
    }

    fn with_multi(multi: MultiProgress, dry_run: bool) -> Self {
        Self {
            multi,
            dry_run,
            sync_bar: RefCell::new(None),
            errors: RefCell::new(Vec::new()),
        }
    }

    /// Progress bars shared with the console log writer
    pub fn multi_progress(&self) -> &MultiProgress {
        &self.multi
    }

    /// Log a state transition
    pub fn transition(&self, from: impl Display, to: impl Display) {
        info!("STATE: {} -> {}", from, to);
    }

    /// Spinner for the download; the fetcher switches it to a byte bar once
    /// the size is known
    pub fn download_bar(&self) -> ProgressBar {
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(120));
        if let Ok(style) =
            ProgressStyle::with_template("{spinner} Downloading... {bytes} ({bytes_per_sec})")
        {
            bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        }
        bar
    }

    /// Log the entries the extractor refused
    pub fn blocked(&self, entries: &[String]) {
        if !entries.is_empty() {
            warn!(
                "{} archive entr(ies) blocked by path confinement",
                entries.len()
            );
        }
    }

    /// Log the entries the extractor skipped because they target `.old_versions`
    pub fn reserved(&self, entries: &[String]) {
        if !entries.is_empty() {
            warn!(
                "{} archive entr(ies) skipped: {} is reserved for archived versions",
                entries.len(),
                ARCHIVE_DIR_NAME
            );
        }
    }

    /// Record a staged file the differencer could not classify
    pub fn record_diff_failure(&self, path: &Path, err: &MirrorError) {
        error!("ERROR: {}: {}", path.display(), err);
        self.errors
            .borrow_mut()
            .push(ErrorRecord::new(Some(path), err));
    }

    /// Initialize the sync bar
    pub fn start_sync(&self, total: usize) {
        let bar = self.multi.add(ProgressBar::new(total as u64));
        if let Ok(style) =
            ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} files | {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        *self.sync_bar.borrow_mut() = Some(bar);
    }

    /// Callback target for [`Synchronizer::apply`](crate::sync::Synchronizer::apply)
    pub fn on_sync_event(&self, event: &SyncEvent<'_>) {
        match event {
            SyncEvent::Applied {
                decision,
                archived_to,
                ..
            } => {
                let rel = decision.relative_path.display();
                self.log_archive(&decision.relative_path, archived_to.as_deref());
                match decision.action {
                    ChangeAction::Unchanged => debug!("SKIP: {} (unchanged)", rel),
                    action => info!("{}: {}", action.label(self.dry_run), rel),
                }
                self.advance_bar(&decision.relative_path);
            }
            SyncEvent::Failed {
                decision,
                archived_to,
                error,
                ..
            } => {
                self.log_archive(&decision.relative_path, archived_to.as_deref());
                error!("ERROR: {}: {}", decision.relative_path.display(), error);
                self.errors
                    .borrow_mut()
                    .push(ErrorRecord::new(Some(decision.relative_path.as_path()), error));
                self.advance_bar(&decision.relative_path);
            }
            SyncEvent::Progress { processed, total } => {
                info!("processed {}/{} files", processed, total);
            }
            SyncEvent::Complete { summary } => {
                if let Some(bar) = self.sync_bar.borrow().as_ref() {
                    bar.finish_with_message(format!(
                        "{} written",
                        HumanBytes(summary.bytes_copied)
                    ));
                }
            }
        }
    }

    /// Log the closing error summary and the summary line
    pub fn finish(&self, summary: &RunSummary) {
        if let Some(bar) = self.sync_bar.take() {
            bar.finish_and_clear();
        }

        let errors = self.errors.borrow();
        if !errors.is_empty() {
            for line in format_error_summary(&errors).lines() {
                warn!("{}", line);
            }
        }

        if self.dry_run {
            info!("SUMMARY (dry run): {}", summary);
        } else {
            info!("SUMMARY: {}", summary);
        }
    }

    fn log_archive(&self, relative_path: &Path, archived_to: Option<&Path>) {
        if let Some(archive) = archived_to {
            let label = if self.dry_run { "DRY-ARCHIVE" } else { "ARCHIVE" };
            info!("{}: {} -> {}", label, relative_path.display(), archive.display());
        }
    }

    fn advance_bar(&self, path: &Path) {
        if let Some(bar) = self.sync_bar.borrow().as_ref() {
            bar.set_message(path.display().to_string());
            bar.inc(1);
        }
    }
}
