//! Error types for the sample-cache synchronization engine

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while synchronizing the sample cache
#[derive(Error, Debug)]
pub enum Error {
    /// Sample name did not split into exactly subject and aspect parts
    #[error("Malformed sample key: {name}")]
    MalformedKey { name: String },

    /// Referenced subject or aspect is missing from cache or unpublished
    #[error("{kind} not found or unpublished: {name}")]
    ResourceNotFound { kind: &'static str, name: String },

    /// Writer-permission check failed for an aspect
    #[error("User {user} is not a writer for aspect {aspect}")]
    UpdateDeleteForbidden { aspect: String, user: String },

    /// Timeout specification could not be parsed
    #[error("Failed to parse duration: {0}")]
    DurationParse(String),

    /// Hash field (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Cache backend holds a different value type at this key
    #[error("Wrong value type at key {key}, expected {expected}")]
    WrongType { key: String, expected: &'static str },

    /// RENAME issued against a key the backend does not hold
    #[error("No such key: {key}")]
    NoSuchKey { key: String },

    /// Cached hash is missing required fields or holds unparseable values
    #[error("Corrupt cache hash at {key}: {reason}")]
    CorruptHash { key: String, reason: String },

    /// Generic cache backend I/O error
    #[error("Cache backend error: {0}")]
    Backend(String),
}

impl Error {
    /// True for failures raised by the backend connection rather than
    /// by input validation.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Error::Backend(_) | Error::WrongType { .. } | Error::NoSuchKey { .. }
        )
    }
}
