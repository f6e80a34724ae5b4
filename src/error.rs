//! Error types for the Ether I/O driver.

use std::io;
use thiserror::Error;

use crate::variant::Variant;

/// Result type alias for Ether I/O operations.
pub type Result<T> = std::result::Result<T, EtherIoError>;

/// Errors that can occur while talking to an Ether I/O board.
///
/// Validation errors (`InvalidPort`, `InvalidLine`, `InvalidParameter`,
/// `Unsupported`) are raised before anything is put on the wire.
#[derive(Debug, Error)]
pub enum EtherIoError {
    /// Port letter outside the range served by the board.
    #[error("Validation error: \"{letter}\" is not a valid port id (expected '{first}'..='{last}')")]
    InvalidPort {
        /// The rejected letter, as supplied by the caller.
        letter: char,
        /// First valid port letter.
        first: char,
        /// Last valid port letter.
        last: char,
    },

    /// Line number outside the range served by the board.
    #[error("Validation error: \"{line}\" is not a valid line number (expected 0..={max})")]
    InvalidLine {
        /// The rejected line number.
        line: u8,
        /// Highest valid line number.
        max: u8,
    },

    /// Invalid parameter provided.
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter.
        parameter: String,
        /// Description of why the parameter is invalid.
        reason: String,
    },

    /// The board variant has no such command.
    #[error("{variant} does not support {operation}")]
    Unsupported {
        /// Variant the operation was attempted on.
        variant: Variant,
        /// Name of the rejected operation.
        operation: &'static str,
    },

    /// No reply arrived within the retry budget.
    #[error("Communication timeout")]
    Timeout,

    /// A pending receive was cancelled by the caller.
    #[error("Receive interrupted")]
    Interrupted,

    /// A reply did not have the shape the operation expects.
    #[error("Protocol error: {reason}")]
    Protocol {
        /// Description of the mismatch.
        reason: String,
    },

    /// The session was already closed.
    #[error("Session is closed")]
    SessionClosed,

    /// I/O error during communication.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl EtherIoError {
    /// Creates a new `InvalidParameter` error.
    ///
    /// # Example
    ///
    /// ```
    /// use ether_io::EtherIoError;
    ///
    /// let err = EtherIoError::invalid_parameter("data", "must not be empty");
    /// ```
    pub fn invalid_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `Protocol` error.
    ///
    /// # Example
    ///
    /// ```
    /// use ether_io::EtherIoError;
    ///
    /// let err = EtherIoError::protocol("reply too short");
    /// ```
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }

    /// Creates a new `Unsupported` error.
    pub fn unsupported(variant: Variant, operation: &'static str) -> Self {
        Self::Unsupported { variant, operation }
    }

    /// Returns `true` for errors raised before any bytes were sent.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidPort { .. }
                | Self::InvalidLine { .. }
                | Self::InvalidParameter { .. }
                | Self::Unsupported { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_port_display() {
        let err = EtherIoError::InvalidPort {
            letter: 'd',
            first: 'a',
            last: 'c',
        };
        assert_eq!(
            err.to_string(),
            "Validation error: \"d\" is not a valid port id (expected 'a'..='c')"
        );
    }

    #[test]
    fn test_invalid_line_display() {
        let err = EtherIoError::InvalidLine { line: 24, max: 23 };
        assert_eq!(
            err.to_string(),
            "Validation error: \"24\" is not a valid line number (expected 0..=23)"
        );
    }

    #[test]
    fn test_timeout_display() {
        assert_eq!(EtherIoError::Timeout.to_string(), "Communication timeout");
        assert_eq!(EtherIoError::Interrupted.to_string(), "Receive interrupted");
    }

    #[test]
    fn test_unsupported_display() {
        let err = EtherIoError::unsupported(Variant::Io24Tpc, "threshold register");
        assert_eq!(err.to_string(), "IO24TPC does not support threshold register");
    }

    #[test]
    fn test_is_validation() {
        assert!(EtherIoError::InvalidLine { line: 99, max: 71 }.is_validation());
        assert!(EtherIoError::invalid_parameter("data", "empty").is_validation());
        assert!(!EtherIoError::Timeout.is_validation());
        assert!(!EtherIoError::protocol("short").is_validation());
    }
}
