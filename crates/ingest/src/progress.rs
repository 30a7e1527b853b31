//! Progress reporting collaborator.
//!
//! Purely observational: reporters never influence control flow.

use data_loader::EntityKind;
use tracing::info;

/// Receives one notification per full batch committed during a load
pub trait ProgressReporter: Send + Sync {
    /// `total` is the number of documents of `kind` inserted so far
    fn batch_committed(&self, kind: EntityKind, total: u64);
}

/// Logs "Inserted N ratings..." through tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn batch_committed(&self, kind: EntityKind, total: u64) {
        info!("Inserted {} {}...", total, kind.collection());
    }
}

/// Discards every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn batch_committed(&self, _kind: EntityKind, _total: u64) {}
}
