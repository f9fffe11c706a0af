//! Mode Switch Controller
//!
//! Reacts to the feature flag toggling between "serve from cache" and "serve
//! from database". The last-observed flag value is persisted under a scalar
//! key; a flip triggers a full populate (enable) or a sample write-back
//! followed by a full eradicate (disable).
//!
//! The persisted value is written *before* the transition runs, so a crash
//! mid-transition retries as a no-op-free re-run on the next reconcile rather
//! than being silently skipped. The key is a bare GET/SET, not a lock: two
//! processes reconciling at once can both observe the flip and both run the
//! transition. Both transitions are idempotent, so this is accepted.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::domain::ports::{CacheBackend, FeatureFlagProvider, SampleWriteback};
use crate::error::Result;
use crate::store::key::PREVIOUS_FLAG_KEY;
use crate::store::CacheSynchronizer;

/// Controller configuration
#[derive(Debug, Clone)]
pub struct ModeSwitchConfig {
    /// Name of the feature flag controlling cache-serving mode
    pub cache_mode_flag: String,
}

impl Default for ModeSwitchConfig {
    fn default() -> Self {
        Self {
            cache_mode_flag: "cache-serving".to_string(),
        }
    }
}

pub struct ModeSwitchController {
    backend: Arc<dyn CacheBackend>,
    flags: Arc<dyn FeatureFlagProvider>,
    writeback: Arc<dyn SampleWriteback>,
    synchronizer: Arc<CacheSynchronizer>,
    config: ModeSwitchConfig,
}

impl ModeSwitchController {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        flags: Arc<dyn FeatureFlagProvider>,
        writeback: Arc<dyn SampleWriteback>,
        synchronizer: Arc<CacheSynchronizer>,
        config: ModeSwitchConfig,
    ) -> Self {
        Self {
            backend,
            flags,
            writeback,
            synchronizer,
            config,
        }
    }

    /// Compare the current flag value against the persisted previous value
    /// and run the matching transition when they differ. Returns `true` when
    /// a transition ran.
    #[instrument(skip(self), fields(flag = %self.config.cache_mode_flag))]
    pub async fn reconcile(&self) -> Result<bool> {
        let current = self.flags.is_feature_enabled(&self.config.cache_mode_flag);
        let previous = self.previous_flag_value().await?;
        if current == previous {
            return Ok(false);
        }

        // Persist before acting: a crash below is retried on next boot
        self.backend
            .set(PREVIOUS_FLAG_KEY, if current { "true" } else { "false" })
            .await?;

        if current {
            info!("Cache mode enabled, populating");
            self.synchronizer.populate().await?;
        } else {
            info!("Cache mode disabled, persisting samples and eradicating");
            self.writeback.persist_samples().await?;
            self.synchronizer.eradicate().await?;
        }
        Ok(true)
    }

    /// Last-observed flag value, defaulting to `false` when the key is absent
    /// or holds anything other than the literal `"true"`.
    async fn previous_flag_value(&self) -> Result<bool> {
        Ok(self
            .backend
            .get(PREVIOUS_FLAG_KEY)
            .await?
            .as_deref()
            .map(|v| v == "true")
            .unwrap_or(false))
    }
}
