//! Error types for header handling.

/// Result type alias for header operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Header error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown authentication result keyword.
    #[error("Unknown authentication result: {0}")]
    UnknownAuthResult(String),
}
