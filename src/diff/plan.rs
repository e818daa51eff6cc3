//! DiffPlan - the full classification of one staging tree

use crate::types::{ChangeAction, ChangeDecision, MirrorError};
use std::path::PathBuf;

/// Result of classifying every staged file
#[derive(Debug, Default)]
pub struct DiffPlan {
    /// Decisions in staging enumeration order
    pub decisions: Vec<ChangeDecision>,

    /// Staged files that could not be classified
    pub failures: Vec<(PathBuf, MirrorError)>,

    /// Aggregate statistics about the plan
    pub stats: PlanStats,
}

impl DiffPlan {
    /// Create a new empty diff plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a decision to the plan and update statistics
    pub fn add_decision(&mut self, decision: ChangeDecision) {
        match decision.action {
            ChangeAction::Create => {
                self.stats.create_count += 1;
                self.stats.total_bytes += decision.size;
            }
            ChangeAction::Replace => {
                self.stats.replace_count += 1;
                self.stats.total_bytes += decision.size;
            }
            ChangeAction::Unchanged => self.stats.unchanged_count += 1,
        }
        self.decisions.push(decision);
    }

    /// Record a per-file classification failure
    pub fn add_failure(&mut self, path: PathBuf, error: MirrorError) {
        self.stats.failed_count += 1;
        self.failures.push((path, error));
    }

    /// Number of decisions that write into the target
    pub fn transfer_count(&self) -> usize {
        self.stats.create_count + self.stats.replace_count
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty() && self.failures.is_empty()
    }
}

/// Statistics about a diff plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanStats {
    pub create_count: usize,
    pub replace_count: usize,
    pub unchanged_count: usize,
    pub failed_count: usize,

    /// Total bytes to transfer (Create + Replace)
    pub total_bytes: u64,
}
