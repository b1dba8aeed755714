//! Authorization Flow: turns client credentials into an [`AuthorizedSession`].
//!
//! A cached token is reused when it covers the requested scopes and is still
//! valid. An expired token is refreshed when possible; everything else goes
//! through interactive consent. New tokens are persisted under the store key
//! before the session is handed out.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use drzob_core::ScopeSet;
use tracing::{debug, info, warn};

use crate::config::ClientCredentials;
use crate::error::{GoogleError, GoogleResult};
use crate::oauth::AuthorizationServer;
use crate::store::{CredentialStore, StoredToken};

/// How long [`has_stored_token`] waits for the store by default.
pub const DEFAULT_PROBE_WAIT: Duration = Duration::from_millis(100);

/// An access token plus the scopes it was granted, valid for one operation.
#[derive(Clone)]
pub struct AuthorizedSession {
    store_key: String,
    access_token: String,
    scopes: ScopeSet,
}

impl AuthorizedSession {
    pub fn new(
        store_key: impl Into<String>,
        access_token: impl Into<String>,
        scopes: ScopeSet,
    ) -> Self {
        Self {
            store_key: store_key.into(),
            access_token: access_token.into(),
            scopes,
        }
    }

    fn from_token(store_key: &str, token: &StoredToken, requested: &ScopeSet) -> Self {
        let granted = token.scopes();
        let scopes = if granted.is_empty() {
            requested.clone()
        } else {
            granted
        };
        Self::new(store_key, token.access_token.clone(), scopes)
    }

    pub fn store_key(&self) -> &str {
        &self.store_key
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn scopes(&self) -> &ScopeSet {
        &self.scopes
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    /// Fails with an authorization error unless the session carries `scope`.
    pub fn require_scope(&self, scope: &str) -> GoogleResult<()> {
        if self.has_scope(scope) {
            Ok(())
        } else {
            Err(GoogleError::authorization(format!(
                "session for '{}' was not granted {}",
                self.store_key, scope
            )))
        }
    }
}

impl fmt::Debug for AuthorizedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedSession")
            .field("store_key", &self.store_key)
            .field("access_token", &"<redacted>")
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Runs the Authorization Flow against a store and an authorization server.
#[derive(Clone)]
pub struct Authorizer {
    store: Arc<dyn CredentialStore>,
    server: Arc<dyn AuthorizationServer>,
}

impl Authorizer {
    pub fn new(store: Arc<dyn CredentialStore>, server: Arc<dyn AuthorizationServer>) -> Self {
        Self { store, server }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Returns a session authorized for `scopes` under `store_key`.
    pub async fn authorize(
        &self,
        credentials: &ClientCredentials,
        scopes: &ScopeSet,
        store_key: &str,
    ) -> GoogleResult<AuthorizedSession> {
        credentials.validate()?;
        if scopes.is_empty() {
            return Err(GoogleError::configuration(
                "at least one scope must be requested",
            ));
        }

        let cached = self.store.load(store_key)?;

        if let Some(token) = &cached {
            if token.scopes().covers(scopes) {
                if !token.is_expired() {
                    debug!("reusing cached token for '{}'", store_key);
                    return Ok(AuthorizedSession::from_token(store_key, token, scopes));
                }
                if token.can_refresh() {
                    let refresh_token = token.refresh_token.as_deref().unwrap_or_default();
                    match self.server.refresh(credentials, refresh_token).await {
                        Ok(grant) => {
                            let refreshed =
                                grant.into_stored(&token.scopes(), token.refresh_token.clone());
                            self.store.save(store_key, &refreshed)?;
                            return Ok(AuthorizedSession::from_token(
                                store_key, &refreshed, scopes,
                            ));
                        }
                        Err(e) => {
                            warn!("token refresh for '{}' failed, asking for consent: {}", store_key, e);
                        }
                    }
                }
            } else {
                info!(
                    "cached token for '{}' lacks requested scopes, asking for consent",
                    store_key
                );
            }
        }

        let consent_scopes = match &cached {
            Some(token) => token.scopes().union(scopes),
            None => scopes.clone(),
        };
        let previous_refresh = cached.and_then(|t| t.refresh_token);

        let grant = self
            .server
            .request_consent(credentials, &consent_scopes)
            .await?;
        let token = grant.into_stored(&consent_scopes, previous_refresh);
        self.store.save(store_key, &token)?;
        info!("authorized '{}' for {}", store_key, token.scopes());

        Ok(AuthorizedSession::from_token(store_key, &token, scopes))
    }

    /// Removes the cached token for `store_key`.
    ///
    /// Returns true if a token was removed.
    pub fn forget(&self, store_key: &str) -> GoogleResult<bool> {
        self.store.delete(store_key)
    }
}

/// Reports whether a token is cached under `store_key`, waiting at most
/// `wait` for the store to answer.
///
/// A slow store, a read error or an absent token all answer false.
pub async fn has_stored_token(
    store: Arc<dyn CredentialStore>,
    store_key: &str,
    wait: Duration,
) -> bool {
    let key = store_key.to_string();
    let probe = tokio::task::spawn_blocking(move || store.load(&key));

    match tokio::time::timeout(wait, probe).await {
        Ok(Ok(Ok(token))) => token.is_some(),
        Ok(Ok(Err(e))) => {
            debug!("token probe for '{}' failed: {}", store_key, e);
            false
        }
        Ok(Err(e)) => {
            debug!("token probe for '{}' panicked: {}", store_key, e);
            false
        }
        Err(_) => {
            debug!("token probe for '{}' timed out after {:?}", store_key, wait);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CALENDAR_SCOPE;
    use crate::error::ErrorKind;
    use crate::store::MemoryTokenStore;
    use crate::testing::ScriptedAuthorizationServer;

    fn creds() -> ClientCredentials {
        ClientCredentials::new("id", "secret")
    }

    fn calendar() -> ScopeSet {
        ScopeSet::new([CALENDAR_SCOPE])
    }

    #[test]
    fn session_debug_redacts_token() {
        let session = AuthorizedSession::new("K", "ya29.secret", calendar());
        let debug = format!("{:?}", session);
        assert!(!debug.contains("ya29.secret"));
        assert!(debug.contains("K"));
    }

    #[test]
    fn require_scope() {
        let session = AuthorizedSession::new("K", "t", calendar());
        assert!(session.require_scope(CALENDAR_SCOPE).is_ok());
        let err = session.require_scope("other").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn empty_scopes_are_rejected() {
        let server = Arc::new(ScriptedAuthorizationServer::granting("a"));
        let authorizer = Authorizer::new(Arc::new(MemoryTokenStore::new()), server.clone());

        let err = authorizer
            .authorize(&creds(), &ScopeSet::default(), "K")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(server.consent_calls(), 0);
    }

    #[tokio::test]
    async fn consent_result_is_persisted() {
        let store = Arc::new(MemoryTokenStore::new());
        let server = Arc::new(ScriptedAuthorizationServer::granting("first"));
        let authorizer = Authorizer::new(store.clone(), server.clone());

        let session = authorizer.authorize(&creds(), &calendar(), "K").await.unwrap();
        assert_eq!(session.access_token(), "first");
        assert!(session.has_scope(CALENDAR_SCOPE));
        assert_eq!(store.load("K").unwrap().unwrap().access_token, "first");
    }

    #[tokio::test]
    async fn failed_consent_is_not_persisted() {
        let store = Arc::new(MemoryTokenStore::new());
        let server = Arc::new(ScriptedAuthorizationServer::denying());
        let authorizer = Authorizer::new(store.clone(), server);

        let err = authorizer
            .authorize(&creds(), &calendar(), "K")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(store.load("K").unwrap().is_none());
    }

    #[tokio::test]
    async fn rejected_refresh_falls_back_to_consent() {
        let mut expired = StoredToken::new("old", Some("revoked".to_string()), Some(3600), &calendar());
        expired.issued_utc = chrono::Utc::now() - chrono::Duration::hours(2);
        let store = Arc::new(MemoryTokenStore::with_token("K", expired));
        let server = Arc::new(ScriptedAuthorizationServer::granting("new").with_failing_refresh());
        let authorizer = Authorizer::new(store.clone(), server.clone());

        let session = authorizer.authorize(&creds(), &calendar(), "K").await.unwrap();
        assert_eq!(session.access_token(), "new");
        assert_eq!(server.refresh_calls(), 1);
        assert_eq!(server.consent_calls(), 1);
    }

    #[tokio::test]
    async fn expired_token_without_refresh_token_asks_for_consent() {
        let mut expired = StoredToken::new("old", Some(String::new()), Some(3600), &calendar());
        expired.issued_utc = chrono::Utc::now() - chrono::Duration::hours(2);
        let store = Arc::new(MemoryTokenStore::with_token("K", expired));
        let server = Arc::new(ScriptedAuthorizationServer::granting("new"));
        let authorizer = Authorizer::new(store, server.clone());

        let session = authorizer.authorize(&creds(), &calendar(), "K").await.unwrap();
        assert_eq!(session.access_token(), "new");
        assert_eq!(server.refresh_calls(), 0);
        assert_eq!(server.consent_calls(), 1);
    }

    #[tokio::test]
    async fn forget_removes_token() {
        let store = Arc::new(MemoryTokenStore::with_token(
            "K",
            StoredToken::new("t", None, None, &calendar()),
        ));
        let authorizer = Authorizer::new(store, Arc::new(ScriptedAuthorizationServer::granting("a")));
        assert!(authorizer.forget("K").unwrap());
        assert!(!authorizer.forget("K").unwrap());
    }

    #[tokio::test]
    async fn probe_reports_presence() {
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryTokenStore::with_token(
            "K",
            StoredToken::new("t", None, None, &calendar()),
        ));
        assert!(has_stored_token(store.clone(), "K", DEFAULT_PROBE_WAIT).await);
        assert!(!has_stored_token(store, "other", DEFAULT_PROBE_WAIT).await);
    }
}
