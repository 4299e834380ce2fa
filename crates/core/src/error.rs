use std::io;
use std::result::Result as StdResult;

use thiserror::Error;

/// Errors that can occur in specdeck
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PortalError {
    /// Configuration file unreadable or undecodable.
    #[error("Config error: {0}")]
    Config(String),

    /// A spec file failed to load (unreadable, not JSON, no usable server).
    #[error("Spec '{name}': {reason}")]
    Spec { name: String, reason: String },

    /// Shard creation, opening, or document indexing failed.
    #[error("Index error: {0}")]
    Index(String),

    /// Query engine reported an internal failure.
    #[error("Search error: {0}")]
    Search(String),

    /// Captured log is missing its mandatory fields.
    #[error("Malformed log: {0}")]
    MalformedLog(String),

    /// Captured URL could not be parsed.
    #[error("Invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Captured URL's host is not in the registry.
    #[error("No spec configured for host {0:?}")]
    UnknownHost(String),

    /// Resolver exhausted all candidates without a template match.
    #[error("No operation found for {method} {path} in spec {spec:?}")]
    NoOperation {
        method: String,
        path: String,
        spec: String,
    },

    /// Replaying a captured request failed.
    #[error("Replay error: {0}")]
    Replay(String),

    /// IO operation error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for specdeck operations.
pub type Result<T> = StdResult<T, PortalError>;
