//! vigilstore - Denormalized Sample-Cache Synchronization Engine
//!
//! Keeps a key-value cache consistent with a relational store for a
//! hierarchical monitoring system: subjects (dot-separated infrastructure
//! paths) are observed against aspects (metric definitions with severity
//! threshold ranges), producing samples whose health status is derived from
//! the aspect's ranges at write time.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Relational hooks        Feature flag          Timeout sweep      │
//! │        │                      │                     │             │
//! │        ▼                      ▼                     ▼             │
//! │  Cache Synchronizer ◀── Mode Switch Controller   Status Engine    │
//! │        │                                                          │
//! │        ├── Key Codec (canonical naming)                           │
//! │        ├── Index Store (per-kind master sets, cascades)           │
//! │        ├── Resource Maps (subject↔aspect hierarchy sets)          │
//! │        └── Aspect Aux Store (tags / writers / ranges)             │
//! │        │                                                          │
//! │        ▼                                                          │
//! │  CacheBackend port (hashes, sets, lists, pipelined batches)       │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - Infrastructure adapters implementing domain ports
//! - [`controller`] - Mode switch reconciliation
//! - [`domain`] - Entities and ports (DDD)
//! - [`error`] - Error types
//! - [`status`] - Pure status computation and timeout detection
//! - [`store`] - Key codec, indexes, resource maps, aux data, synchronizer

pub mod adapters;
pub mod controller;
pub mod domain;
pub mod error;
pub mod status;
pub mod store;

// Re-export commonly used types
pub use controller::{ModeSwitchConfig, ModeSwitchController};
pub use domain::model::{
    Aspect, EntityKind, RelatedLink, Sample, SampleInput, Status, Subject, ThresholdRange, UserRef,
};
pub use domain::ports::{
    BatchCommand, CacheBackend, FeatureFlagProvider, RelationalStore, SampleWriteback,
};
pub use error::{Error, Result};
pub use status::{compute_status, is_timed_out, parse_timeout_seconds};
pub use store::{CacheSynchronizer, IndexStore, NamePart, ResourceMaps, SyncMetricsSnapshot};
