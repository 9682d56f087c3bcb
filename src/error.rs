//! Error types for the beat-rate pipeline.

/// Errors that can occur while conditioning a trace or estimating its rate
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Insufficient peaks: found {found}, at least 2 are needed for an interval")]
    InsufficientPeaks { found: usize },
    #[error("Numerical error: {0}")]
    Numerical(&'static str),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed trace at line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidParameter(message.into())
    }
}

/// Result type alias for pipeline operations
pub type Result<T, E = Error> = std::result::Result<T, E>;
