//! Error types for MIME operations.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Writing the serialized message failed.
    #[error("I/O error while writing message: {0}")]
    Io(#[from] std::io::Error),
}
