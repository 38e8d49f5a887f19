use std::path::PathBuf;
use thiserror::Error;

/// Main error type for followgraph
#[derive(Error, Debug)]
pub enum FollowgraphError {
    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persisted state exists but could not be loaded. Callers must decide
    /// whether to abort; the in-memory graph is never silently reset.
    #[error("Failed to load persisted state from {}: {reason}", path.display())]
    StateLoad { path: PathBuf, reason: String },

    /// A single profile fetch failed (recoverable at the crawl level)
    #[error("Fetch error for profile {profile_id}: {reason}")]
    Fetch { profile_id: String, reason: String },

    /// Profile not present in the fetch backend
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),
}

/// Convenient Result type using FollowgraphError
pub type Result<T> = std::result::Result<T, FollowgraphError>;
