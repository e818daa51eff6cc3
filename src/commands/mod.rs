//! Command implementations

pub mod mirror;

pub use mirror::{run, run_with, RunReport, RunState};
