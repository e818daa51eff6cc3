//! Command-line interface

use clap::Parser;
use std::path::PathBuf;

/// Mirror a shared archive link into a local directory
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "dropmirror", version, about)]
pub struct Cli {
    /// Compute and report changes without touching the target directory
    #[arg(long)]
    pub dry_run: bool,

    /// Settings file (defaults to ./.dropbox_mirror.env, then ~/.dropbox_mirror.env)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log debug-level detail
    #[arg(short, long)]
    pub verbose: bool,
}
