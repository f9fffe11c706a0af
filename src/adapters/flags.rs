//! Feature Flag and Writeback Adapters
//!
//! Small implementations of the `FeatureFlagProvider` and `SampleWriteback`
//! ports for embedding and testing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;

use crate::domain::ports::{FeatureFlagProvider, SampleWriteback};
use crate::error::Result;

/// Flag provider answering the same value for every flag.
#[derive(Debug, Clone, Default)]
pub struct FixedFlagProvider {
    enabled: bool,
}

impl FixedFlagProvider {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl FeatureFlagProvider for FixedFlagProvider {
    fn is_feature_enabled(&self, _name: &str) -> bool {
        self.enabled
    }
}

/// Flag provider that can be flipped at runtime, for exercising mode-switch
/// transitions.
#[derive(Debug, Default)]
pub struct ToggleFlagProvider {
    enabled: AtomicBool,
}

impl ToggleFlagProvider {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn set(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

impl FeatureFlagProvider for ToggleFlagProvider {
    fn is_feature_enabled(&self, _name: &str) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

/// Writeback hook that does nothing. For deployments where samples are
/// persisted by another process.
#[derive(Debug, Clone, Default)]
pub struct NoopWriteback;

#[async_trait]
impl SampleWriteback for NoopWriteback {
    async fn persist_samples(&self) -> Result<()> {
        Ok(())
    }
}

/// Writeback hook counting its invocations, for asserting transition order
/// in tests.
#[derive(Debug, Default)]
pub struct RecordingWriteback {
    calls: AtomicU64,
}

impl RecordingWriteback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SampleWriteback for RecordingWriteback {
    async fn persist_samples(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_provider_flips() {
        let flags = ToggleFlagProvider::new(false);
        assert!(!flags.is_feature_enabled("cache-serving"));
        flags.set(true);
        assert!(flags.is_feature_enabled("cache-serving"));
    }

    #[tokio::test]
    async fn test_recording_writeback_counts() {
        let writeback = RecordingWriteback::new();
        writeback.persist_samples().await.unwrap();
        writeback.persist_samples().await.unwrap();
        assert_eq!(writeback.calls(), 2);
    }
}
