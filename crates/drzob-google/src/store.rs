//! Credential Store: persisted OAuth tokens keyed by a store key.
//!
//! The file-backed store writes one JSON document per key into a directory.
//! Both the file name (`Google.Apis.Auth.OAuth2.Responses.TokenResponse-<key>`)
//! and the document shape follow the token cache layout of Google's classic
//! client libraries, so an existing cache directory can be shared.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Local, Utc};
use drzob_core::ScopeSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GoogleError, GoogleResult};

/// Prefix of every token file name.
const TOKEN_FILE_PREFIX: &str = "Google.Apis.Auth.OAuth2.Responses.TokenResponse-";

/// Tokens are considered expired this long before their real expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// An OAuth token as persisted in the Credential Store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Lifetime of the access token in seconds, counted from `issued_utc`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Granted scopes, space-delimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Local issue time. Written for compatibility, never read back.
    #[serde(rename = "Issued", default, skip_serializing_if = "Option::is_none")]
    pub issued: Option<String>,

    /// When the access token was issued.
    #[serde(rename = "IssuedUtc", default)]
    pub issued_utc: DateTime<Utc>,
}

impl StoredToken {
    /// Creates a token issued now.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: Option<i64>,
        scopes: &ScopeSet,
    ) -> Self {
        let now = Utc::now();
        Self {
            access_token: access_token.into(),
            token_type: Some("Bearer".to_string()),
            expires_in,
            refresh_token,
            scope: (!scopes.is_empty()).then(|| scopes.to_space_delimited()),
            issued: Some(now.with_timezone(&Local).to_rfc3339()),
            issued_utc: now,
        }
    }

    /// Returns the granted scopes.
    pub fn scopes(&self) -> ScopeSet {
        self.scope
            .as_deref()
            .map(ScopeSet::from_space_delimited)
            .unwrap_or_default()
    }

    /// Returns when the access token stops being accepted, if it expires.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_in
            .map(|secs| self.issued_utc + Duration::seconds(secs))
    }

    /// Returns true if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expires_at) => now >= expires_at - Duration::seconds(EXPIRY_MARGIN_SECS),
            None => false,
        }
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

impl fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredToken")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("issued_utc", &self.issued_utc)
            .finish()
    }
}

/// A persistent store of tokens keyed by store key.
pub trait CredentialStore: Send + Sync {
    /// Returns the token stored under `key`, if any.
    fn load(&self, key: &str) -> GoogleResult<Option<StoredToken>>;

    /// Stores `token` under `key`, replacing any previous token.
    fn save(&self, key: &str, token: &StoredToken) -> GoogleResult<()>;

    /// Removes the token stored under `key`.
    ///
    /// Returns true if a token was removed.
    fn delete(&self, key: &str) -> GoogleResult<bool>;

    /// Describes where the token for `key` lives, for status output.
    fn describe(&self, key: &str) -> String;
}

/// File-backed [`CredentialStore`].
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the file that holds the token for `key`.
    pub fn path_for(&self, key: &str) -> GoogleResult<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
            return Err(GoogleError::storage(format!("invalid store key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}{}", TOKEN_FILE_PREFIX, key)))
    }
}

impl CredentialStore for FileTokenStore {
    fn load(&self, key: &str) -> GoogleResult<Option<StoredToken>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            debug!("no token file at {}", path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            GoogleError::storage(format!("failed to read {}", path.display())).with_source(e)
        })?;
        let token: StoredToken = serde_json::from_str(&content).map_err(|e| {
            GoogleError::storage(format!("failed to parse {}", path.display())).with_source(e)
        })?;

        debug!("loaded token for '{}' from {}", key, path.display());
        Ok(Some(token))
    }

    fn save(&self, key: &str, token: &StoredToken) -> GoogleResult<()> {
        let path = self.path_for(key)?;

        fs::create_dir_all(&self.dir).map_err(|e| {
            GoogleError::storage(format!("failed to create {}", self.dir.display())).with_source(e)
        })?;

        let content = serde_json::to_string_pretty(token)
            .map_err(|e| GoogleError::storage("failed to serialize token").with_source(e))?;

        // Same directory as the target so the rename stays on one filesystem.
        let temp_path = self.dir.join(format!("{}{}.tmp", TOKEN_FILE_PREFIX, key));
        fs::write(&temp_path, content).map_err(|e| {
            GoogleError::storage(format!("failed to write {}", temp_path.display())).with_source(e)
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600));
        }

        fs::rename(&temp_path, &path).map_err(|e| {
            GoogleError::storage(format!("failed to replace {}", path.display())).with_source(e)
        })?;

        info!("saved token for '{}' to {}", key, path.display());
        Ok(())
    }

    fn delete(&self, key: &str) -> GoogleResult<bool> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|e| {
            GoogleError::storage(format!("failed to remove {}", path.display())).with_source(e)
        })?;
        info!("removed token for '{}'", key);
        Ok(true)
    }

    fn describe(&self, key: &str) -> String {
        match self.path_for(key) {
            Ok(path) => path.display().to_string(),
            Err(_) => self.dir.display().to_string(),
        }
    }
}

/// In-memory [`CredentialStore`], lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<String, StoredToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `token` under `key`.
    pub fn with_token(key: impl Into<String>, token: StoredToken) -> Self {
        let store = Self::new();
        store.tokens.lock().unwrap().insert(key.into(), token);
        store
    }
}

impl CredentialStore for MemoryTokenStore {
    fn load(&self, key: &str) -> GoogleResult<Option<StoredToken>> {
        Ok(self.tokens.lock().unwrap().get(key).cloned())
    }

    fn save(&self, key: &str, token: &StoredToken) -> GoogleResult<()> {
        self.tokens
            .lock()
            .unwrap()
            .insert(key.to_string(), token.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> GoogleResult<bool> {
        Ok(self.tokens.lock().unwrap().remove(key).is_some())
    }

    fn describe(&self, key: &str) -> String {
        format!("memory:{}", key)
    }
}
