//! Error types for authorization and Google API operations.
//!
//! Every failure in this crate is a [`GoogleError`] tagged with an
//! [`ErrorKind`]. The kind decides how the shell reports the failure: kinds
//! for which [`ErrorKind::is_user_facing`] is true are shown to the user
//! verbatim, everything else is logged.

use std::fmt;
use thiserror::Error;

/// The category of a [`GoogleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Client id or client secret missing or blank. Raised before any I/O.
    MissingCredentials,
    /// Consent, token exchange or refresh failed, or the session lacks a scope.
    Authorization,
    /// No calendar carries the expected display name.
    CalendarNotFound,
    /// A remote call failed or returned something unusable.
    Operation,
    /// The caller supplied an unusable value (e.g. an event ending before it starts).
    InvalidInput,
    /// The credential store could not be read or written.
    Storage,
    /// Invalid configuration.
    Configuration,
}

impl ErrorKind {
    /// Returns true if the failure is reported to the user directly rather
    /// than only logged.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::MissingCredentials | Self::CalendarNotFound | Self::InvalidInput
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "missing_credentials",
            Self::Authorization => "authorization",
            Self::CalendarNotFound => "calendar_not_found",
            Self::Operation => "operation",
            Self::InvalidInput => "invalid_input",
            Self::Storage => "storage",
            Self::Configuration => "configuration",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error raised while authorizing or talking to Google.
#[derive(Debug, Error)]
pub struct GoogleError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl GoogleError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// The pre-flight failure shown when the client id or secret is blank.
    pub fn missing_credentials() -> Self {
        Self::new(
            ErrorKind::MissingCredentials,
            "You must enter ClientId and ClientSecret first!",
        )
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    /// The failure shown when no calendar is named `display_name`.
    pub fn calendar_not_found(display_name: &str) -> Self {
        Self::new(
            ErrorKind::CalendarNotFound,
            format!("The calendar '{}' does not exist!", display_name),
        )
    }

    pub fn operation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Operation, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Attaches the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_user_facing(&self) -> bool {
        self.kind.is_user_facing()
    }
}

impl fmt::Display for GoogleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_user_facing() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

/// Result alias for this crate.
pub type GoogleResult<T> = Result<T, GoogleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_facing_kinds() {
        assert!(ErrorKind::MissingCredentials.is_user_facing());
        assert!(ErrorKind::CalendarNotFound.is_user_facing());
        assert!(ErrorKind::InvalidInput.is_user_facing());
        assert!(!ErrorKind::Authorization.is_user_facing());
        assert!(!ErrorKind::Operation.is_user_facing());
        assert!(!ErrorKind::Storage.is_user_facing());
    }

    #[test]
    fn missing_credentials_message() {
        let err = GoogleError::missing_credentials();
        assert_eq!(err.kind(), ErrorKind::MissingCredentials);
        assert_eq!(
            err.to_string(),
            "You must enter ClientId and ClientSecret first!"
        );
    }

    #[test]
    fn calendar_not_found_message() {
        let err = GoogleError::calendar_not_found("DrZob");
        assert_eq!(err.to_string(), "The calendar 'DrZob' does not exist!");
    }

    #[test]
    fn logged_errors_carry_their_kind() {
        let err = GoogleError::operation("calendars.list failed (500)");
        assert_eq!(err.to_string(), "operation: calendars.list failed (500)");
    }

    #[test]
    fn source_is_exposed() {
        use std::error::Error;
        let io_err = std::io::Error::other("disk full");
        let err = GoogleError::storage("failed to write token").with_source(io_err);
        assert!(err.source().is_some());
    }
}
