//! Client credentials and Google service configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{GoogleError, GoogleResult};

/// Store key under which this application caches its token.
pub const DEFAULT_STORE_KEY: &str = "drzob-google_calendar";

/// Display name of the calendar that receives test events.
pub const DEFAULT_CALENDAR_NAME: &str = "DrZob";

/// Scope granting read/write access to calendars and events.
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// Scope granting read access to the user's contacts.
pub const CONTACTS_SCOPE: &str = "https://www.googleapis.com/auth/contacts.readonly";

/// OAuth 2.0 client credentials, as issued by the Google Cloud Console.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Layout of the credentials JSON downloaded from the Cloud Console.
///
/// Desktop clients use an `installed` section, web clients a `web` section;
/// some tools write the two fields at the root.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<CredentialsSection>,
    web: Option<CredentialsSection>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CredentialsSection {
    client_id: String,
    client_secret: String,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads credentials from a Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> GoogleResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GoogleError::configuration(format!(
                "failed to read credentials file {}",
                path.display()
            ))
            .with_source(e)
        })?;
        Self::from_json(&content)
    }

    /// Parses credentials from Cloud Console JSON.
    pub fn from_json(json: &str) -> GoogleResult<Self> {
        let file: CredentialsFile = serde_json::from_str(json).map_err(|e| {
            GoogleError::configuration("failed to parse credentials JSON").with_source(e)
        })?;

        if let Some(section) = file.installed.or(file.web) {
            return Ok(Self::new(section.client_id, section.client_secret));
        }

        match (file.client_id, file.client_secret) {
            (Some(id), Some(secret)) => Ok(Self::new(id, secret)),
            _ => Err(GoogleError::configuration(
                "credentials JSON needs an 'installed'/'web' section or root-level client_id and client_secret",
            )),
        }
    }

    /// Returns true if both values are present once surrounding whitespace is
    /// ignored.
    pub fn is_complete(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }

    /// Fails with a missing-credentials error unless [`is_complete`](Self::is_complete).
    pub fn validate(&self) -> GoogleResult<()> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(GoogleError::missing_credentials())
        }
    }
}

/// Google OAuth endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthEndpoints {
    pub auth_url: String,
    pub token_url: String,
}

impl Default for OAuthEndpoints {
    fn default() -> Self {
        Self {
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
        }
    }
}

/// Settings for the authorization flow and the REST clients.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Key identifying this application's cached token.
    pub store_key: String,

    /// Directory holding cached tokens.
    ///
    /// Defaults to `~/.credentials/drzob_calendar`.
    pub token_dir: PathBuf,

    /// Display name of the calendar that receives events.
    pub calendar_name: String,

    /// Timeout for each HTTP request.
    pub timeout: Duration,

    /// Ports tried, in order, for the loopback OAuth redirect.
    pub loopback_port_range: (u16, u16),

    pub endpoints: OAuthEndpoints,

    /// Base URL of the Calendar v3 API.
    pub calendar_api_base: String,

    /// Base URL of the People v1 API.
    pub people_api_base: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            store_key: DEFAULT_STORE_KEY.to_string(),
            token_dir: Self::default_token_dir(),
            calendar_name: DEFAULT_CALENDAR_NAME.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            loopback_port_range: (8080, 8090),
            endpoints: OAuthEndpoints::default(),
            calendar_api_base: "https://www.googleapis.com/calendar/v3".to_string(),
            people_api_base: "https://people.googleapis.com/v1".to_string(),
        }
    }
}

impl GoogleConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `~/.credentials/drzob_calendar`, or a relative path when no
    /// home directory is known.
    pub fn default_token_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".credentials")
            .join("drzob_calendar")
    }

    pub fn with_store_key(mut self, key: impl Into<String>) -> Self {
        self.store_key = key.into();
        self
    }

    pub fn with_token_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.token_dir = dir.into();
        self
    }

    pub fn with_calendar_name(mut self, name: impl Into<String>) -> Self {
        self.calendar_name = name.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> GoogleResult<()> {
        if self.store_key.trim().is_empty() {
            return Err(GoogleError::configuration("store key must not be empty"));
        }
        if self.calendar_name.is_empty() {
            return Err(GoogleError::configuration("calendar name must not be empty"));
        }
        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err(GoogleError::configuration("invalid loopback port range"));
        }
        Ok(())
    }
}
