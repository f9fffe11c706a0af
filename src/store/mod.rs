//! Denormalized Cache Store
//!
//! The cache-side half of the engine: canonical key naming, per-kind master
//! index sets, derived resource maps, publish-gated auxiliary data, and the
//! synchronizer that keeps all of them consistent with the relational store.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Cache Synchronizer                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Key Codec   │ Index Store  │ Resource Maps │ Aspect Aux     │
//! │  (naming)    │ (master sets)│ (hierarchy)   │ (tags/writers/ │
//! │              │              │               │  ranges)       │
//! │         └────────────┴──────┬───────┴───────────┘            │
//! │                             │                                 │
//! │                 Batched command submission                    │
//! │                 (one pipeline per cascade)                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod aspect_aux;
pub mod index;
pub mod key;
pub mod metrics;
pub mod resource;
pub mod synchronizer;

pub use aspect_aux::AspectAuxStore;
pub use index::{IndexStore, NamePart};
pub use key::{AuxField, KEY_PREFIX, KEY_SEPARATOR, PREVIOUS_FLAG_KEY};
pub use metrics::{SyncMetrics, SyncMetricsSnapshot};
pub use resource::ResourceMaps;
pub use synchronizer::CacheSynchronizer;
