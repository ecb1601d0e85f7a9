//! Common error types for hprep

use thiserror::Error;

/// Common result type for hprep operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the hprep pipelines
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Corpus metadata index could not be opened or read
    #[error("Index error: {0}")]
    Index(String),

    /// MIDI catalog could not be loaded
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Malformed input record (pair list line, etc.)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON decode/encode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary array encode/decode error
    #[error("Encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    /// MIDI data could not be parsed or has no usable content
    #[error("MIDI error: {0}")]
    Midi(String),

    /// Feature extraction failed
    #[error("Feature error: {0}")]
    Features(String),

    /// Paired matrices disagree on their time axis
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
}
