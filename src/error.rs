//! Error types for the conversion pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while converting a document
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to launch the rendering engine process
    #[error("Engine launch failed: {0}")]
    SessionLaunch(String),

    /// Failed to acquire a session even after a forced recycle-and-retry
    #[error("Session acquisition failed after retry: {0}")]
    SessionAcquire(String),

    /// Failed to load the renderable document into the engine
    #[error("Failed to load document: {0}")]
    Load(String),

    /// The loaded document produced no renderable body element
    #[error("No renderable body element found after load")]
    SurfaceMissing,

    /// Screenshot capture failed
    #[error("Capture failed: {0}")]
    Capture(String),

    /// A bounded wait expired without completing
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// A fatal error wrapped with conversion context for the caller
    #[error("Conversion failed: {0}")]
    Conversion(String),

    /// File I/O error (reading input or writing output)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
