//! Mirror command: fetch, extract, diff and sync one remote archive

use crate::config::Settings;
use crate::diff::Differencer;
use crate::extract::{extract_archive, staged_entries};
use crate::fetch::{ArchiveFetcher, HttpFetcher, CONNECT_TIMEOUT};
use crate::logging::LogSession;
use crate::sync::{SyncCallback, Synchronizer};
use crate::types::{MirrorError, RunSummary};
use crate::ui::Reporter;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use tempfile::TempDir;
use tracing::{error, info, warn};

/// Prefix of the per-run staging directory under the system temp dir
pub const STAGING_PREFIX: &str = "dbx_sync_";

/// Orchestrator states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Init,
    Fetching,
    Extracting,
    Diffing,
    Syncing,
    Cleanup,
    Done,
    Failed,
}

impl RunState {
    /// Whether moving from `self` to `next` is a legal step
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Init, Fetching)
                | (Fetching, Extracting)
                | (Fetching, Failed)
                | (Extracting, Diffing)
                | (Extracting, Failed)
                | (Diffing, Syncing)
                | (Syncing, Cleanup)
                | (Cleanup, Done)
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Init => "Init",
            RunState::Fetching => "Fetching",
            RunState::Extracting => "Extracting",
            RunState::Diffing => "Diffing",
            RunState::Syncing => "Syncing",
            RunState::Cleanup => "Cleanup",
            RunState::Done => "Done",
            RunState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Outcome of one run
#[derive(Debug)]
pub struct RunReport {
    /// Last state reached
    pub state: RunState,
    pub summary: RunSummary,
    /// Fatal error, if the run did not reach `Done`
    pub error: Option<MirrorError>,
    /// Every state entered, in order, starting with `Init`
    pub history: Vec<RunState>,
}

impl RunReport {
    fn aborted(error: MirrorError) -> Self {
        Self {
            state: RunState::Init,
            summary: RunSummary::default(),
            error: Some(error),
            history: vec![RunState::Init],
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == RunState::Done
    }

    /// Process exit status: zero whenever `Done` was reached
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            return 0;
        }
        self.error.as_ref().map(MirrorError::exit_code).unwrap_or(1)
    }
}

/// Per-run context passed to every stage
struct RunContext<'a> {
    settings: &'a Settings,
    reporter: &'a Reporter,
    state: RunState,
    history: Vec<RunState>,
    _log: LogSession,
}

impl<'a> RunContext<'a> {
    fn new(settings: &'a Settings, reporter: &'a Reporter, log: LogSession) -> Self {
        Self {
            settings,
            reporter,
            state: RunState::Init,
            history: vec![RunState::Init],
            _log: log,
        }
    }

    fn advance(&mut self, next: RunState) {
        if !self.state.can_transition_to(next) {
            warn!("Unexpected state transition {} -> {}", self.state, next);
        }
        self.reporter.transition(self.state, next);
        self.state = next;
        self.history.push(next);
    }

    /// Enter `Failed`, clean up and close the log
    fn fail(mut self, err: MirrorError, staging: Option<TempDir>) -> RunReport {
        error!("FATAL: {}", err);
        self.advance(RunState::Failed);
        cleanup(&self.settings.download_path, staging);
        info!("=== RUN END (failed, exit {}) ===", err.exit_code());

        RunReport {
            state: self.state,
            summary: RunSummary::default(),
            error: Some(err),
            history: self.history,
        }
    }

    fn finish(self, summary: RunSummary) -> RunReport {
        self.reporter.finish(&summary);
        info!("=== RUN END ===");

        RunReport {
            state: self.state,
            summary,
            error: None,
            history: self.history,
        }
    }
}

/// Run one mirror pass over HTTP
pub fn run(settings: &Settings, verbose: bool) -> RunReport {
    let fetcher = HttpFetcher::default().with_timeouts(CONNECT_TIMEOUT, settings.fetch_timeout);
    let reporter = Reporter::new(settings.dry_run);
    run_with(settings, &fetcher, &reporter, verbose)
}

/// Run one mirror pass with an explicit fetcher and reporter
///
/// Never panics on I/O problems: fatal failures come back in the report,
/// per-file failures are counted in its summary.
pub fn run_with(
    settings: &Settings,
    fetcher: &dyn ArchiveFetcher,
    reporter: &Reporter,
    verbose: bool,
) -> RunReport {
    if let Err(err) = prepare_directories(settings) {
        return RunReport::aborted(err);
    }
    let log = match LogSession::start(&settings.log_path, verbose, reporter.multi_progress()) {
        Ok(log) => log,
        Err(err) => return RunReport::aborted(err),
    };

    let mut ctx = RunContext::new(settings, reporter, log);
    info!("=== RUN START ===");
    info!("URL: {}", settings.remote_url);
    info!("Target: {}", settings.target_dir.display());
    info!(
        "Dry run: {} | Keep versions: {}",
        settings.dry_run, settings.keep_versions
    );

    // Fetching
    ctx.advance(RunState::Fetching);
    let bar = reporter.download_bar();
    let fetched = fetcher.fetch(&settings.remote_url, &settings.download_path, &bar);
    bar.finish_and_clear();
    if let Err(err) = fetched {
        return ctx.fail(err, None);
    }

    // Extracting
    ctx.advance(RunState::Extracting);
    let staging = match tempfile::Builder::new().prefix(STAGING_PREFIX).tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            let err = MirrorError::Extraction {
                archive: settings.download_path.clone(),
                reason: format!("cannot create staging directory: {}", e),
            };
            return ctx.fail(err, None);
        }
    };
    let extracted = match extract_archive(&settings.download_path, staging.path()) {
        Ok(report) => report,
        Err(err) => return ctx.fail(err, Some(staging)),
    };
    reporter.blocked(&extracted.blocked);
    reporter.reserved(&extracted.reserved);

    // Diffing
    ctx.advance(RunState::Diffing);
    let plan = Differencer::new(&settings.target_dir).plan(staged_entries(staging.path()));
    if plan.is_empty() {
        warn!("Archive contained no files to mirror");
    }
    info!(
        "Plan: {} to transfer ({} new, {} changed), {} unchanged, {} failed",
        plan.transfer_count(),
        plan.stats.create_count,
        plan.stats.replace_count,
        plan.stats.unchanged_count,
        plan.stats.failed_count
    );
    for (path, err) in &plan.failures {
        reporter.record_diff_failure(path, err);
    }

    // Syncing
    ctx.advance(RunState::Syncing);
    let synchronizer = Synchronizer::new(
        &settings.target_dir,
        settings.keep_versions,
        settings.dry_run,
    );
    let swept = synchronizer.sweep_stale_parts();
    if swept > 0 {
        info!("Removed {} stale temp file(s) from an interrupted run", swept);
    }
    reporter.start_sync(plan.decisions.len());
    let on_event: &SyncCallback<'_> = &|event| reporter.on_sync_event(event);
    let mut summary = synchronizer.apply(&plan.decisions, Some(on_event));
    summary.errors += plan.failures.len();
    summary.blocked = extracted.blocked.len();
    summary.skipped = extracted.reserved.len();

    // Cleanup
    ctx.advance(RunState::Cleanup);
    cleanup(&settings.download_path, Some(staging));

    ctx.advance(RunState::Done);
    ctx.finish(summary)
}

/// Create the directories a run needs before anything is fetched
pub fn prepare_directories(settings: &Settings) -> Result<(), MirrorError> {
    let mut required = Vec::new();
    if !settings.dry_run {
        required.push(settings.target_dir.as_path());
    }
    required.extend(settings.log_path.parent());
    required.extend(settings.download_path.parent());

    for dir in required {
        if dir.as_os_str().is_empty() {
            continue;
        }
        fs::create_dir_all(dir).map_err(|source| MirrorError::DirectoryCreation {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Remove the downloaded archive and the staging directory
///
/// Either may already be gone; that is not an error.
fn cleanup(download_path: &Path, staging: Option<TempDir>) {
    match fs::remove_file(download_path) {
        Ok(()) => info!("Removed {}", download_path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove {}: {}", download_path.display(), e),
    }

    if let Some(dir) = staging {
        let path = dir.path().to_path_buf();
        match dir.close() {
            Ok(()) => info!("Removed staging directory {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove staging directory {}: {}", path.display(), e),
        }
    }
}
