/// Error types for pattern-pulse
///
/// Sparse or degenerate data is never an error here: the analytics return
/// defined fallback results for those. Only malformed arguments and the
/// storage/config layers produce a `PulseError`.

use thiserror::Error;

/// Main error type for pattern-pulse operations
#[derive(Error, Debug)]
pub enum PulseError {
    /// Caller passed malformed data (negative counts, empty names, inverted windows)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O errors (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pattern not present in the library
    #[error("Pattern not found: {0}")]
    PatternNotFound(String),

    /// Two library entries share a name
    #[error("Duplicate pattern: {0}")]
    DuplicatePattern(String),
}

/// Result type alias for pattern-pulse operations
pub type Result<T> = std::result::Result<T, PulseError>;

impl PulseError {
    /// Shorthand used by validation code all over the crate
    pub fn invalid(msg: impl Into<String>) -> Self {
        PulseError::InvalidInput(msg.into())
    }

    /// Convert to a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            PulseError::InvalidInput(reason) => {
                format!("Invalid input: {}", reason)
            }
            PulseError::Database(e) => {
                format!("Metrics store error. Please try again. Details: {}", e)
            }
            PulseError::Io(e) => {
                format!("File system error. Check permissions. Details: {}", e)
            }
            PulseError::Serialization(e) => {
                format!("Data format error: {}", e)
            }
            PulseError::Config(msg) => {
                format!("Configuration issue: {}", msg)
            }
            PulseError::PatternNotFound(name) => {
                format!("Pattern '{}' is not in the library", name)
            }
            PulseError::DuplicatePattern(name) => {
                format!("Pattern '{}' is defined more than once", name)
            }
        }
    }
}
