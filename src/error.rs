//! Error types for leak checking
//!
//! Nothing in this crate is fatal to the process under test. Parse errors
//! and leaks are turned into messages for an [`ErrorReporter`], and the
//! check keeps going.
//!
//! [`ErrorReporter`]: crate::reporter::ErrorReporter

use std::num::ParseIntError;
use thiserror::Error;

use crate::deadline::DeadlineCause;

/// A stack record that could not be decoded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed stack record: {0:?}")]
    MissingBody(String),

    #[error("error parsing stack header: {0:?}")]
    MalformedHeader(String),

    #[error("error parsing task id {token:?}: {source}")]
    InvalidId {
        token: String,
        #[source]
        source: ParseIntError,
    },
}

/// Errors surfaced by a leak check
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("failed to enumerate tasks: {0}")]
    Enumerate(#[from] std::io::Error),

    #[error("leaked task: {0}")]
    Leaked(String),

    #[error("{0}")]
    Deadline(DeadlineCause),
}

/// Result type for leak check operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_body_message() {
        let err = ParseError::MissingBody("thread 1 [running]:".to_string());
        assert_eq!(
            err.to_string(),
            "malformed stack record: \"thread 1 [running]:\""
        );
    }

    #[test]
    fn test_invalid_id_keeps_source() {
        let source = "NaN".parse::<u64>().unwrap_err();
        let err = ParseError::InvalidId {
            token: "NaN".to_string(),
            source,
        };
        assert!(err.to_string().starts_with("error parsing task id \"NaN\""));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_parse_error_is_transparent() {
        let err: Error = ParseError::MalformedHeader("thread 7:".to_string()).into();
        assert_eq!(err.to_string(), "error parsing stack header: \"thread 7:\"");
    }

    #[test]
    fn test_leaked_and_deadline_messages() {
        let leaked = Error::Leaked("thread 9 [sleeping]:\nname: worker".to_string());
        assert!(leaked.to_string().starts_with("leaked task: thread 9"));

        let deadline = Error::Deadline(DeadlineCause::Exceeded);
        assert_eq!(deadline.to_string(), "deadline exceeded");
    }

    #[test]
    fn test_enumerate_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no /proc");
        let err: Error = io.into();
        assert_eq!(err.to_string(), "failed to enumerate tasks: no /proc");
    }
}
