//! Core type definitions for dropmirror

mod action;
mod entry;
mod error;
mod summary;

pub use action::{ChangeAction, ChangeDecision};
pub use entry::{StagedEntry, TargetEntry};
pub use error::MirrorError;
pub use summary::RunSummary;
