//! Error types for the pCloud client
//!
//! Every failure the library can surface is a variant of [`Error`]. API errors
//! carry the provider's message verbatim so callers can match on it.

use thiserror::Error;

/// Message the provider returns from `stat` for a missing file
pub const FILE_NOT_FOUND: &str = "File not found.";

/// Message the provider returns from `listfolder` for a missing folder
pub const FOLDER_NOT_FOUND: &str = "Directory does not exist.";

/// Result type alias for pCloud operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the pCloud client
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid access token, data region, timeout or time zone
    #[error("Configuration error: {0}")]
    Config(String),

    /// The provider answered with an `error` field in the JSON body
    #[error("{0}")]
    Api(String),

    /// A timestamp field had a shape the normalizer cannot interpret
    #[error("Unrecognized time format: {0}")]
    UnrecognizedTimeFormat(String),

    /// Caller supplied unsupported or malformed parameters
    #[error("Invalid parameters: {0}")]
    Validation(String),

    /// The upload response did not list any uploaded file
    #[error("Upload failed: no file was returned by the server")]
    UploadFailed,

    /// A mandatory entity attribute was absent
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A file category code outside the known set
    #[error("Unknown file category code: {0}")]
    UnknownCategory(u64),

    /// Transport-level failure (DNS, TLS, timeout, connection reset)
    #[error("Network error: {0}")]
    Network(String),

    /// The response body was not the JSON shape the operation expects
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The provider's message, if this is an API error
    pub fn api_message(&self) -> Option<&str> {
        match self {
            Error::Api(msg) => Some(msg),
            _ => None,
        }
    }

    /// Whether the provider reported that a file or folder does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self.api_message(), Some(FILE_NOT_FOUND | FOLDER_NOT_FOUND))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_displays_message_verbatim() {
        let err = Error::Api("Don't do it".to_string());
        assert_eq!(err.to_string(), "Don't do it");
        assert_eq!(err.api_message(), Some("Don't do it"));
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::Api(FILE_NOT_FOUND.to_string()).is_not_found());
        assert!(Error::Api(FOLDER_NOT_FOUND.to_string()).is_not_found());
        assert!(!Error::Api("Access denied.".to_string()).is_not_found());
        assert!(!Error::Config(FILE_NOT_FOUND.to_string()).is_not_found());
    }

    #[test]
    fn test_non_api_errors_have_no_api_message() {
        assert!(Error::UploadFailed.api_message().is_none());
        assert!(Error::MissingField("name").api_message().is_none());
    }
}
