//! Client configuration.
//!
//! All settings live in `~/.config/drzob/config.toml` by default:
//!
//! ```toml
//! [google]
//! client_id = "pass::google/drzob-client-id"
//! client_secret = "env::DRZOB_CLIENT_SECRET"
//! calendar_name = "DrZob"
//! token_dir = "/home/me/.credentials/drzob_calendar"
//! timeout_secs = 30
//! ```
//!
//! `client_id` and `client_secret` accept secret references (see
//! [`crate::secret`]).

use std::path::{Path, PathBuf};
use std::time::Duration;

use drzob_google::{ClientCredentials, GoogleConfig};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};
use crate::secret::{self, SecretRef};

/// Configuration for the drzob client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Google settings.
    pub google: GoogleSettings,
}

/// Google settings, including the optional inline credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Google Cloud Console credentials JSON file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_key: Option<String>,

    /// Display name of the calendar that receives events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_name: Option<String>,

    /// HTTP request timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub loopback_port_start: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub loopback_port_end: Option<u16>,
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults if it is absent.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            ClientError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("drzob")
    }

    /// Returns a copy with every default spelled out and inline secrets
    /// redacted, for `drzob config dump`.
    pub fn effective(&self) -> ClientResult<Self> {
        let google = self.google.to_google_config()?;
        let redact = |value: &Option<String>| value.as_deref().map(|v| SecretRef::parse(v).to_string());

        Ok(Self {
            debug: self.debug,
            google: GoogleSettings {
                client_id: self.google.client_id.clone(),
                client_secret: redact(&self.google.client_secret),
                credentials_file: self.google.credentials_file.clone(),
                token_dir: Some(google.token_dir),
                store_key: Some(google.store_key),
                calendar_name: Some(google.calendar_name),
                timeout_secs: Some(google.timeout.as_secs()),
                loopback_port_start: Some(google.loopback_port_range.0),
                loopback_port_end: Some(google.loopback_port_range.1),
            },
        })
    }
}

impl GoogleSettings {
    /// Builds the Google configuration, keeping defaults for unset values.
    pub fn to_google_config(&self) -> ClientResult<GoogleConfig> {
        let mut config = GoogleConfig::new();

        if let Some(ref dir) = self.token_dir {
            config = config.with_token_dir(dir);
        }
        if let Some(ref key) = self.store_key {
            config = config.with_store_key(key);
        }
        if let Some(ref name) = self.calendar_name {
            config = config.with_calendar_name(name);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if self.loopback_port_start.is_some() || self.loopback_port_end.is_some() {
            let (start, end) = config.loopback_port_range;
            config = config.with_loopback_port_range(
                self.loopback_port_start.unwrap_or(start),
                self.loopback_port_end.unwrap_or(end),
            );
        }

        config.validate()?;
        Ok(config)
    }

    /// Resolves the inline credentials, if both values are configured.
    ///
    /// Each value goes through [`secret::resolve`].
    pub fn resolve_credentials(&self) -> ClientResult<Option<ClientCredentials>> {
        let (Some(raw_id), Some(raw_secret)) = (&self.client_id, &self.client_secret) else {
            return Ok(None);
        };

        let client_id = secret::resolve(raw_id)
            .map_err(|e| ClientError::Config(format!("failed to resolve client_id: {}", e)))?;
        let client_secret = secret::resolve(raw_secret)
            .map_err(|e| ClientError::Config(format!("failed to resolve client_secret: {}", e)))?;

        Ok(Some(ClientCredentials::new(client_id, client_secret)))
    }
}
