//! RunSummary - counters accumulated during synchronization

use super::ChangeAction;
use std::fmt;

/// Per-run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub created: usize,
    pub replaced: usize,
    pub unchanged: usize,
    pub archived: usize,
    pub errors: usize,

    /// Archive entries rejected by path confinement
    pub blocked: usize,

    /// Archive entries dropped because they target `.old_versions`
    pub skipped: usize,

    /// Bytes written into the target (or that would be, in dry-run)
    pub bytes_copied: u64,
}

impl RunSummary {
    /// Count one successfully applied decision
    pub fn record(&mut self, action: ChangeAction, bytes: u64) {
        match action {
            ChangeAction::Create => self.created += 1,
            ChangeAction::Replace => self.replaced += 1,
            ChangeAction::Unchanged => self.unchanged += 1,
        }
        self.bytes_copied += bytes;
    }

    /// Count one per-file failure
    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    /// True when something in the target changed (or would change)
    pub fn has_changes(&self) -> bool {
        self.created > 0 || self.replaced > 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created={} replaced={} unchanged={} archived={} errors={}",
            self.created, self.replaced, self.unchanged, self.archived, self.errors
        )?;
        if self.blocked > 0 {
            write!(f, " blocked={}", self.blocked)?;
        }
        if self.skipped > 0 {
            write!(f, " skipped={}", self.skipped)?;
        }
        Ok(())
    }
}
