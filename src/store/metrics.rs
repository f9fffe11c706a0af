//! Synchronization Metrics
//!
//! Lightweight atomic counters tracking cache-sync activity. No exposition
//! endpoint; the embedding process reads snapshots.

use std::sync::atomic::{AtomicU64, Ordering};

/// Sync activity counters
#[derive(Debug, Default)]
pub struct SyncMetrics {
    populate_runs: AtomicU64,
    eradicate_runs: AtomicU64,
    samples_upserted: AtomicU64,
    samples_deleted: AtomicU64,
    cascade_renames: AtomicU64,
    cascade_deletes: AtomicU64,
    batches_submitted: AtomicU64,
    commands_submitted: AtomicU64,
    swallowed_errors: AtomicU64,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_populate(&self) {
        self.populate_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eradicate(&self) {
        self.eradicate_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sample_upsert(&self) {
        self.samples_upserted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sample_delete(&self) {
        self.samples_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cascade_rename(&self) {
        self.cascade_renames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cascade_delete(&self) {
        self.cascade_deletes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one pipelined submission of `commands` commands.
    pub fn record_batch(&self, commands: u64) {
        self.batches_submitted.fetch_add(1, Ordering::Relaxed);
        self.commands_submitted.fetch_add(commands, Ordering::Relaxed);
    }

    /// Record a failure that was logged and swallowed (best-effort paths).
    pub fn record_swallowed_error(&self) {
        self.swallowed_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        SyncMetricsSnapshot {
            populate_runs: self.populate_runs.load(Ordering::Relaxed),
            eradicate_runs: self.eradicate_runs.load(Ordering::Relaxed),
            samples_upserted: self.samples_upserted.load(Ordering::Relaxed),
            samples_deleted: self.samples_deleted.load(Ordering::Relaxed),
            cascade_renames: self.cascade_renames.load(Ordering::Relaxed),
            cascade_deletes: self.cascade_deletes.load(Ordering::Relaxed),
            batches_submitted: self.batches_submitted.load(Ordering::Relaxed),
            commands_submitted: self.commands_submitted.load(Ordering::Relaxed),
            swallowed_errors: self.swallowed_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncMetricsSnapshot {
    pub populate_runs: u64,
    pub eradicate_runs: u64,
    pub samples_upserted: u64,
    pub samples_deleted: u64,
    pub cascade_renames: u64,
    pub cascade_deletes: u64,
    pub batches_submitted: u64,
    pub commands_submitted: u64,
    pub swallowed_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = SyncMetrics::new();
        metrics.record_populate();
        metrics.record_batch(5);
        metrics.record_batch(3);
        metrics.record_swallowed_error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.populate_runs, 1);
        assert_eq!(snapshot.batches_submitted, 2);
        assert_eq!(snapshot.commands_submitted, 8);
        assert_eq!(snapshot.swallowed_errors, 1);
    }
}
