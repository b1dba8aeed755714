//! Per-invocation wiring: credentials, Google configuration and the
//! Authorization Flow.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use drzob_google::{
    Authorizer, ClientCredentials, CredentialStore, FileTokenStore, GoogleConfig, GoogleError,
    OAuthClient,
};
use tracing::debug;

use crate::cli::Cli;
use crate::config::{ClientConfig, GoogleSettings};
use crate::error::ClientResult;

/// Everything a command needs to reach Google.
#[derive(Debug)]
pub struct AppContext {
    google: GoogleConfig,
    settings: GoogleSettings,
    client_id: Option<String>,
    client_secret: Option<String>,
    credentials_file: Option<PathBuf>,
    store: Arc<FileTokenStore>,
}

impl AppContext {
    /// Builds the context from the command line and the loaded config.
    ///
    /// Credentials are resolved only when a command asks for them, so
    /// `status` and `logout` work without any.
    pub fn new(cli: &Cli, config: &ClientConfig) -> ClientResult<Self> {
        let google = config.google.to_google_config()?;
        let store = Arc::new(FileTokenStore::new(&google.token_dir));

        Ok(Self {
            google,
            settings: config.google.clone(),
            client_id: cli.client_id.clone(),
            client_secret: cli.client_secret.clone(),
            credentials_file: cli.credentials_file.clone(),
            store,
        })
    }

    pub fn google(&self) -> &GoogleConfig {
        &self.google
    }

    /// Returns the client credentials, failing if none could be resolved.
    pub fn credentials(&self) -> ClientResult<ClientCredentials> {
        resolve_credentials(
            self.client_id.as_deref(),
            self.client_secret.as_deref(),
            self.credentials_file.as_deref(),
            &self.settings,
        )
    }

    pub fn store(&self) -> Arc<dyn CredentialStore> {
        self.store.clone()
    }

    /// Where the cached token lives.
    pub fn token_location(&self) -> String {
        self.store.describe(&self.google.store_key)
    }

    /// Builds the Authorization Flow over the file store and Google's OAuth
    /// endpoints.
    pub fn authorizer(&self) -> ClientResult<Authorizer> {
        let server = OAuthClient::new(
            self.google.endpoints.clone(),
            self.google.loopback_port_range,
            self.google.timeout,
        )?;
        Ok(Authorizer::new(self.store(), Arc::new(server)))
    }
}

/// Resolves Google credentials from multiple sources.
///
/// Priority (highest to lowest):
/// 1. CLI `--client-id` + `--client-secret` (or their environment variables)
/// 2. CLI `--credentials-file`
/// 3. `config.toml` `[google]` inline credentials
/// 4. `config.toml` `[google]` `credentials_file`
///
/// Nothing usable, including a lone `--client-id` or `--client-secret`, is a
/// missing-credentials error.
pub fn resolve_credentials(
    cli_client_id: Option<&str>,
    cli_client_secret: Option<&str>,
    cli_credentials_file: Option<&Path>,
    settings: &GoogleSettings,
) -> ClientResult<ClientCredentials> {
    if let (Some(id), Some(secret)) = (cli_client_id, cli_client_secret) {
        debug!("using client credentials from the command line");
        return Ok(ClientCredentials::new(id, secret));
    }
    if cli_client_id.is_some() || cli_client_secret.is_some() {
        return Err(GoogleError::missing_credentials().into());
    }

    if let Some(path) = cli_credentials_file {
        debug!("using client credentials from {}", path.display());
        return Ok(ClientCredentials::from_file(path)?);
    }

    if let Some(credentials) = settings.resolve_credentials()? {
        debug!("using client credentials from config.toml");
        return Ok(credentials);
    }

    if let Some(path) = settings.credentials_file.as_ref().map(PathBuf::as_path) {
        debug!("using client credentials from {}", path.display());
        return Ok(ClientCredentials::from_file(path)?);
    }

    Err(GoogleError::missing_credentials().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use drzob_google::ErrorKind;

    fn write_credentials_file(dir: &Path) -> PathBuf {
        let path = dir.join("creds.json");
        std::fs::write(
            &path,
            r#"{"installed": {"client_id": "file-id.apps.googleusercontent.com", "client_secret": "file-secret"}}"#,
        )
        .unwrap();
        path
    }

    fn config_settings() -> GoogleSettings {
        GoogleSettings {
            client_id: Some("config-id.apps.googleusercontent.com".to_string()),
            client_secret: Some("config-secret".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn cli_pair_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let file = write_credentials_file(tmp.path());
        let creds = resolve_credentials(
            Some("cli-id"),
            Some("cli-secret"),
            Some(&file),
            &config_settings(),
        )
        .unwrap();
        assert_eq!(creds.client_id, "cli-id");
        assert_eq!(creds.client_secret, "cli-secret");
    }

    #[test]
    fn credentials_file_beats_config() {
        let tmp = tempfile::tempdir().unwrap();
        let file = write_credentials_file(tmp.path());
        let creds = resolve_credentials(None, None, Some(&file), &config_settings()).unwrap();
        assert_eq!(creds.client_id, "file-id.apps.googleusercontent.com");
    }

    #[test]
    fn config_is_the_fallback() {
        let creds = resolve_credentials(None, None, None, &config_settings()).unwrap();
        assert_eq!(creds.client_id, "config-id.apps.googleusercontent.com");

        let tmp = tempfile::tempdir().unwrap();
        let settings = GoogleSettings {
            credentials_file: Some(write_credentials_file(tmp.path())),
            ..Default::default()
        };
        let creds = resolve_credentials(None, None, None, &settings).unwrap();
        assert_eq!(creds.client_secret, "file-secret");
    }

    #[test]
    fn partial_or_absent_credentials_are_missing() {
        for (id, secret) in [(Some("id"), None), (None, Some("secret")), (None, None)] {
            let err = resolve_credentials(id, secret, None, &GoogleSettings::default()).unwrap_err();
            assert!(err.is_user_facing());
            assert_eq!(
                err.as_google().map(GoogleError::kind),
                Some(ErrorKind::MissingCredentials)
            );
        }
    }

    #[test]
    fn partial_cli_pair_does_not_fall_back_to_config() {
        let tmp = tempfile::tempdir().unwrap();
        let file = write_credentials_file(tmp.path());
        for (id, secret) in [(Some("cli-id"), None), (None, Some("cli-secret"))] {
            for cli_file in [None, Some(file.as_path())] {
                let err =
                    resolve_credentials(id, secret, cli_file, &config_settings()).unwrap_err();
                assert_eq!(
                    err.as_google().map(GoogleError::kind),
                    Some(ErrorKind::MissingCredentials)
                );
            }
        }
    }

    #[test]
    fn unreadable_credentials_file_is_configuration_error() {
        let err = resolve_credentials(
            None,
            None,
            Some(Path::new("/nonexistent/drzob/creds.json")),
            &GoogleSettings::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.as_google().map(GoogleError::kind),
            Some(ErrorKind::Configuration)
        );
    }
}
