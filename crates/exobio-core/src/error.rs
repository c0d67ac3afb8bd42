//! Error types for the exobiology toolkit

use thiserror::Error;

use crate::types::NodeKind;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core errors
#[derive(Debug, Error)]
pub enum Error {
    /// System has no bodies to map
    #[error("System {0} must have at least one body")]
    EmptySystem(String),

    /// Two bodies in one system carry the same id
    #[error("Duplicate body id {id} encountered in system {system}")]
    DuplicateBodyId { system: String, id: i32 },

    /// A parent reference points at an id no node owns
    #[error("Unknown body id {id} while mapping system {system}")]
    UnknownBodyId { system: String, id: i32 },

    /// A parent reference's declared kind disagrees with the referenced node
    #[error("Node kind mismatch in system {system}: node {id} is {found:?}, reference expects {expected:?}")]
    NodeKindMismatch {
        system: String,
        id: i32,
        expected: NodeKind,
        found: NodeKind,
    },

    /// Malformed body payload from the catalog
    #[error("Invalid body data for {body}: {message}")]
    InvalidBody { body: String, message: String },

    /// System record has no coordinates yet
    #[error("System {0} is missing coordinates")]
    MissingCoordinates(String),

    /// Named system is not in the cache
    #[error("System not found: {0}")]
    SystemNotFound(String),

    /// A scan references a body id the system map does not contain
    #[error("Body id {id} not found in system {system}")]
    BodyNotFound { system: String, id: i32 },

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache store encoding error
    #[error("Cache encode error: {0}")]
    CacheEncode(#[from] bincode::error::EncodeError),

    /// Cache store decoding error
    #[error("Cache decode error: {0}")]
    CacheDecode(#[from] bincode::error::DecodeError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid body error
    pub fn invalid_body(body: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidBody {
            body: body.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
