//! Error types for the log analyzer

use thiserror::Error;

/// Result type alias for analyzer operations
pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Error types that can occur while collecting or serving metrics
///
/// Parse misses are deliberately not represented here: a log line that
/// matches no known layout is skipped and tallied, never surfaced as an
/// error. Likewise an unreadable log source is logged and skipped by the
/// collection driver rather than failing the pass.
#[derive(Error, Debug, Clone)]
pub enum AnalyzerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Platform probe error: {0}")]
    ProbeError(String),

    #[error("Collection failed: {0}")]
    CollectionError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for AnalyzerError {
    fn from(err: std::io::Error) -> Self {
        AnalyzerError::IoError(err.to_string())
    }
}
