//! Structured error types for the basepair toolkit.

use thiserror::Error;

/// Unified error type for all basepair operations.
#[derive(Debug, Error)]
pub enum BasepairError {
    /// I/O error from an underlying reader, writer or child process pipe.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed input at a known line.
    #[error("parse error: line {line}: {message}")]
    Parse { line: usize, message: String },

    /// A record field that parsed but violates its format rules.
    #[error("validation error: {field}: {message}")]
    Validation { field: String, message: String },

    /// Invalid input (bad arguments, unsupported letters, unknown names)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A structural guarantee could not be met (e.g. too few unique k-mers).
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// No combination of the inputs satisfies the request.
    #[error("{0}")]
    Combinatorial(String),

    /// The surrounding pipeline was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// A single line exceeded the parser's maximum line size.
    #[error("line {line} exceeds maximum line size of {limit} bytes")]
    LineTooLong { line: usize, limit: usize },

    /// Compression or decompression failure
    #[error("compression error: {0}")]
    Compression(String),

    /// Hashing failure
    #[error("hash error: {0}")]
    Hash(String),

    /// External process failure (spawn, wait, non-zero exit).
    #[error("process error: {0}")]
    Process(String),
}

impl BasepairError {
    /// Shorthand for a [`BasepairError::Parse`] at `line`.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Shorthand for a [`BasepairError::Validation`] on `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether this error is the cancellation marker.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Convenience alias used throughout the basepair crates.
pub type Result<T> = std::result::Result<T, BasepairError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_names_line() {
        let err = BasepairError::parse(12, "bad field");
        assert_eq!(err.to_string(), "parse error: line 12: bad field");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short");
        let err: BasepairError = io.into();
        assert!(matches!(err, BasepairError::Io(_)));
    }

    #[test]
    fn cancelled_is_detectable() {
        assert!(BasepairError::Cancelled.is_cancelled());
        assert!(!BasepairError::Invariant("x".into()).is_cancelled());
    }
}
