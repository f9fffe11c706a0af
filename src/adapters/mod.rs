//! Infrastructure adapters implementing the domain ports

mod flags;
mod memory;
mod relational;

pub use flags::{FixedFlagProvider, NoopWriteback, RecordingWriteback, ToggleFlagProvider};
pub use memory::MemoryBackend;
pub use relational::InMemoryRelationalStore;
