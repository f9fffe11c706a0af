//! Domain Ports (DDD Port/Adapter Pattern)
//!
//! Core abstractions the synchronization engine depends on. Infrastructure
//! adapters implement these traits to provide concrete backends.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Synchronization Layer                     │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                    Ports (Traits)                    │    │
//! │  │  CacheBackend │ RelationalStore │ FeatureFlagProvider│    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Infrastructure Layer                       │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                  Adapters (Impls)                    │    │
//! │  │  MemoryBackend │ InMemoryRelationalStore │ FixedFlags│    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::domain::model::{Aspect, Sample, Subject};
use crate::error::Result;

// =============================================================================
// Cache Backend Port
// =============================================================================

/// One command in a pipelined batch.
///
/// A cascading operation (rename, cascade delete, populate phase) collects all
/// of its mutations into a single `Vec<BatchCommand>` and submits it through
/// [`CacheBackend::exec`], so the whole operation reaches the backend as one
/// unit of work.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchCommand {
    /// Set hash fields, creating the hash when absent.
    HSet {
        key: String,
        fields: Vec<(String, String)>,
    },
    /// Delete keys of any value type.
    Del { keys: Vec<String> },
    /// Add members to a set.
    SAdd { key: String, members: Vec<String> },
    /// Remove members from a set.
    SRem { key: String, members: Vec<String> },
    /// Rename a key in place, preserving its value.
    Rename { old: String, new: String },
    /// Set a scalar string key.
    Set { key: String, value: String },
    /// Append values to a list, preserving insertion order.
    RPush { key: String, values: Vec<String> },
}

/// Port for the shared networked key-value store holding the denormalized
/// cache.
///
/// Single commands suspend at one network round-trip each. `exec` submits a
/// batch all-or-nothing; application on the backend side is best-effort, and
/// there is no isolation between concurrently submitted batches.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn hset(&self, key: &str, fields: Vec<(String, String)>) -> Result<()>;

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Returns the number of keys actually removed.
    async fn del(&self, keys: &[String]) -> Result<u64>;

    async fn sadd(&self, key: &str, members: Vec<String>) -> Result<u64>;

    async fn srem(&self, key: &str, members: Vec<String>) -> Result<u64>;

    async fn smembers(&self, key: &str) -> Result<HashSet<String>>;

    async fn sismember(&self, key: &str, member: &str) -> Result<bool>;

    /// Fails with [`crate::Error::NoSuchKey`] when `old` is absent.
    async fn rename(&self, old: &str, new: &str) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Full contents of a list key, empty when absent.
    async fn lrange(&self, key: &str) -> Result<Vec<String>>;

    /// Submit a pipelined batch as one unit of work.
    async fn exec(&self, batch: Vec<BatchCommand>) -> Result<()>;
}

// =============================================================================
// Relational Store Port
// =============================================================================

/// Port for the authoritative relational store.
///
/// The synchronizer only consumes query results; it does not define the schema.
/// Implementations exclude soft-deleted rows.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    async fn find_subjects(&self) -> Result<Vec<Subject>>;

    /// Aspects with their writer sets eagerly loaded.
    async fn find_aspects(&self) -> Result<Vec<Aspect>>;

    /// Samples whose subject and aspect are both published. Rows with an
    /// unpublished endpoint stay in the relational store but never enter the
    /// cache.
    async fn find_samples(&self) -> Result<Vec<Sample>>;
}

// =============================================================================
// Feature Flag Port
// =============================================================================

/// Port for the feature flag provider, polled synchronously by the mode switch
/// controller.
pub trait FeatureFlagProvider: Send + Sync {
    fn is_feature_enabled(&self, name: &str) -> bool;
}

// =============================================================================
// Sample Writeback Port
// =============================================================================

/// Port for persisting cached samples back to the relational store before the
/// cache is eradicated on a cache-mode disable transition.
///
/// The write-back itself lives with the relational layer; the controller only
/// needs a hook to invoke.
#[async_trait]
pub trait SampleWriteback: Send + Sync {
    async fn persist_samples(&self) -> Result<()>;
}
