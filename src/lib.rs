//! # dropmirror - Mirror a shared archive into a local folder
//!
//! Downloads a zip from a public share link, unpacks it into a throwaway
//! staging directory and copies new or changed files into a persistent
//! mirror. Replaced files can be kept under `.old_versions/`; files that only
//! exist in the mirror are never touched.

// Module declarations
pub mod config;
pub mod fetch;
pub mod extract;
pub mod hash;
pub mod diff;
pub mod sync;
pub mod ui;
pub mod logging;
pub mod commands;
pub mod types;

// Re-export commonly used types
pub use types::{ChangeAction, ChangeDecision, MirrorError, RunSummary, StagedEntry, TargetEntry};
pub use config::Settings;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
