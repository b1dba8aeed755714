//! Client error types.

use drzob_google::GoogleError;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A secret reference could not be resolved.
    #[error("secret error: {0}")]
    Secret(String),

    /// Authorization or Google API failure.
    #[error(transparent)]
    Google(#[from] GoogleError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Returns the Google failure behind this error, if any.
    pub fn as_google(&self) -> Option<&GoogleError> {
        match self {
            Self::Google(e) => Some(e),
            _ => None,
        }
    }

    /// Returns true if the error is shown to the user verbatim.
    pub fn is_user_facing(&self) -> bool {
        self.as_google().is_some_and(GoogleError::is_user_facing)
    }
}
