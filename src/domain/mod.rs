//! Domain layer: entities mirrored into the cache plus the ports the
//! synchronization engine depends on.

pub mod model;
pub mod ports;

pub use model::{
    parent_of, Aspect, EntityKind, RelatedLink, Sample, SampleInput, Status, Subject,
    ThresholdRange, UserRef, RANGE_CEILING, RANGE_FLOOR, SAMPLE_SEPARATOR,
};
pub use ports::{
    BatchCommand, CacheBackend, FeatureFlagProvider, RelationalStore, SampleWriteback,
};
