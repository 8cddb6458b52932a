//! Error types for Ambimix.

use thiserror::Error;

/// Main error type for Ambimix operations.
#[derive(Error, Debug)]
pub enum AmbimixError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value was rejected; the previous value is kept.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The playback primitive could not provide a resource (e.g. load failed).
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// Structural preset violation; rejected before any state mutation.
    #[error("Invalid preset: {0}")]
    InvalidPreset(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AmbimixError {
    /// True for errors that leave state untouched and only need reporting.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::ResourceUnavailable(_) | Self::NotFound(_)
        )
    }
}

/// Result type alias for Ambimix operations.
pub type Result<T> = std::result::Result<T, AmbimixError>;
