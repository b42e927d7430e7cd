//! Error types for stash-inspector core.

use std::{error::Error, fmt, io};

/// Error type for repository server lookups and report generation.
#[derive(Debug)]
pub enum StashError {
    /// The server could not be reached or the request failed in flight.
    Transport(String),
    /// The server rejected the supplied credentials.
    Authentication(String),
    /// The response body was not JSON or did not have the expected shape.
    MalformedResponse(String),
    /// An endpoint template referenced a parameter that was not supplied.
    MissingParameter(String),
    /// The project filter is not a valid regular expression.
    InvalidFilter(String),
    /// An underlying I/O error.
    Io(io::Error),
    /// A catch-all error with a message.
    Other(String),
}

impl fmt::Display for StashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "transport error: {message}"),
            Self::Authentication(message) => write!(f, "authentication failed: {message}"),
            Self::MalformedResponse(message) => write!(f, "malformed response: {message}"),
            Self::MissingParameter(name) => write!(f, "missing template parameter: {name}"),
            Self::InvalidFilter(message) => write!(f, "invalid project filter: {message}"),
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Other(message) => write!(f, "{message}"),
        }
    }
}

impl Error for StashError {}

impl From<io::Error> for StashError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for StashError {
    fn from(value: serde_json::Error) -> Self {
        Self::MalformedResponse(value.to_string())
    }
}

impl From<regex::Error> for StashError {
    fn from(value: regex::Error) -> Self {
        Self::InvalidFilter(value.to_string())
    }
}

impl StashError {
    /// Whether the error means a probe reached the server but got a non-JSON answer.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedResponse(_))
    }
}

/// Convenience result type for stash-inspector core.
pub type Result<T> = std::result::Result<T, StashError>;

#[cfg(test)]
mod tests {
    use super::StashError;
    use std::io;

    #[test]
    fn io_error_formats_message() {
        let error = StashError::Io(io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(format!("{error}"), "io error: boom");
    }

    #[test]
    fn transport_error_formats_message() {
        let error = StashError::Transport("connection refused".to_string());
        assert_eq!(format!("{error}"), "transport error: connection refused");
    }

    #[test]
    fn missing_parameter_names_placeholder() {
        let error = StashError::MissingParameter("projectKey".to_string());
        assert_eq!(format!("{error}"), "missing template parameter: projectKey");
    }

    #[test]
    fn from_json_error_maps_to_malformed() {
        let parse_error = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        let error: StashError = parse_error.into();
        assert!(error.is_malformed());
    }

    #[test]
    fn from_regex_error_maps_to_invalid_filter() {
        let regex_error = regex::Regex::new("(").unwrap_err();
        let error: StashError = regex_error.into();
        match error {
            StashError::InvalidFilter(message) => assert!(!message.is_empty()),
            other => panic!("expected InvalidFilter, got {other:?}"),
        }
    }
}
