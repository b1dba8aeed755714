//! OAuth 2.0 authorization server access.
//!
//! [`OAuthClient`] runs the Authorization Code flow with PKCE over a loopback
//! redirect, the flow Google recommends for desktop applications:
//!
//! 1. Generate a code verifier, its SHA-256 challenge and a random state
//! 2. Bind a listener on the first free loopback port in the configured range
//! 3. Open the browser on Google's consent page
//! 4. Receive `GET /callback?code=..&state=..` from the browser
//! 5. Check the state, then exchange the code (with the verifier) for tokens
//!
//! Refreshing an expired access token goes through the same token endpoint.

use std::fmt;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use drzob_core::ScopeSet;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::api::BoxFuture;
use crate::config::{ClientCredentials, OAuthEndpoints};
use crate::error::{GoogleError, GoogleResult};
use crate::store::StoredToken;

/// Verifier length in bytes, before base64 encoding.
const CODE_VERIFIER_LENGTH: usize = 32;

/// How long the user has to approve the consent screen.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// A successful response from the token endpoint.
#[derive(Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Granted scopes, space-delimited. Google omits it on some refreshes.
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenGrant {
    /// Converts the grant into a storable token.
    ///
    /// `requested` stands in for the granted scopes when the response has
    /// none, and `previous_refresh` is kept when no new refresh token was
    /// issued (the usual case for a refresh grant).
    pub fn into_stored(self, requested: &ScopeSet, previous_refresh: Option<String>) -> StoredToken {
        let scopes = match self.scope.as_deref() {
            Some(scope) if !scope.trim().is_empty() => ScopeSet::from_space_delimited(scope),
            _ => requested.clone(),
        };
        let refresh_token = self.refresh_token.or(previous_refresh);
        let mut token = StoredToken::new(self.access_token, refresh_token, self.expires_in, &scopes);
        if self.token_type.is_some() {
            token.token_type = self.token_type;
        }
        token
    }
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

/// The remote OAuth collaborator used by the Authorization Flow.
pub trait AuthorizationServer: Send + Sync {
    /// Runs the interactive consent flow for `scopes` and returns the tokens.
    fn request_consent<'a>(
        &'a self,
        credentials: &'a ClientCredentials,
        scopes: &'a ScopeSet,
    ) -> BoxFuture<'a, GoogleResult<TokenGrant>>;

    /// Exchanges a refresh token for a new access token.
    fn refresh<'a>(
        &'a self,
        credentials: &'a ClientCredentials,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, GoogleResult<TokenGrant>>;
}

/// Google's OAuth 2.0 endpoints, reached over HTTP.
#[derive(Debug)]
pub struct OAuthClient {
    endpoints: OAuthEndpoints,
    port_range: (u16, u16),
    http_client: reqwest::Client,
}

impl OAuthClient {
    pub fn new(
        endpoints: OAuthEndpoints,
        port_range: (u16, u16),
        timeout: Duration,
    ) -> GoogleResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GoogleError::configuration("failed to create HTTP client").with_source(e))?;

        Ok(Self {
            endpoints,
            port_range,
            http_client,
        })
    }

    async fn consent(
        &self,
        credentials: &ClientCredentials,
        scopes: &ScopeSet,
    ) -> GoogleResult<TokenGrant> {
        let pkce = PkceFlow::new();

        let (listener, port) = bind_loopback_server(self.port_range)?;
        let redirect_uri = format!("http://127.0.0.1:{}/callback", port);
        let auth_url = pkce.build_auth_url(
            &self.endpoints.auth_url,
            &credentials.client_id,
            &redirect_uri,
            scopes,
        )?;

        info!("opening browser for Google consent");
        debug!("authorization URL: {}", auth_url);
        if let Err(e) = open::that(auth_url.as_str()) {
            warn!("failed to open browser: {}", e);
            eprintln!("\nOpen this URL in your browser to continue:\n\n{}\n", auth_url);
        }

        let callback =
            tokio::task::spawn_blocking(move || wait_for_callback(listener, CALLBACK_TIMEOUT))
                .await
                .map_err(|e| {
                    GoogleError::authorization("OAuth callback listener failed").with_source(e)
                })??;

        if callback.state != pkce.state {
            return Err(GoogleError::authorization(
                "OAuth state mismatch, refusing the authorization code",
            ));
        }

        info!("received authorization code, exchanging for tokens");
        self.exchange_code(credentials, &callback.code, &pkce.verifier, &redirect_uri)
            .await
    }

    async fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> GoogleResult<TokenGrant> {
        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];
        self.post_token_request(&params, "token exchange").await
    }

    async fn refresh_grant(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> GoogleResult<TokenGrant> {
        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let grant = self.post_token_request(&params, "token refresh").await?;
        info!("refreshed access token");
        Ok(grant)
    }

    async fn post_token_request(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> GoogleResult<TokenGrant> {
        let response = self
            .http_client
            .post(&self.endpoints.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                GoogleError::authorization(format!("{} request failed", what)).with_source(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            GoogleError::authorization(format!("failed to read {} response", what)).with_source(e)
        })?;

        if !status.is_success() {
            return Err(GoogleError::authorization(format!(
                "{} rejected ({}): {}",
                what,
                status,
                describe_oauth_error(&body)
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            GoogleError::authorization(format!("invalid {} response", what)).with_source(e)
        })
    }
}

impl AuthorizationServer for OAuthClient {
    fn request_consent<'a>(
        &'a self,
        credentials: &'a ClientCredentials,
        scopes: &'a ScopeSet,
    ) -> BoxFuture<'a, GoogleResult<TokenGrant>> {
        Box::pin(self.consent(credentials, scopes))
    }

    fn refresh<'a>(
        &'a self,
        credentials: &'a ClientCredentials,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, GoogleResult<TokenGrant>> {
        Box::pin(self.refresh_grant(credentials, refresh_token))
    }
}

/// Error body returned by the token endpoint.
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Turns a token endpoint error body into a short message.
fn describe_oauth_error(body: &str) -> String {
    match serde_json::from_str::<OAuthErrorBody>(body) {
        Ok(OAuthErrorBody {
            error,
            error_description: Some(description),
        }) => format!("{} ({})", error, description),
        Ok(OAuthErrorBody { error, .. }) => error,
        Err(_) => body.trim().to_string(),
    }
}

/// Binds the first free loopback port in `port_range`.
fn bind_loopback_server(port_range: (u16, u16)) -> GoogleResult<(TcpListener, u16)> {
    for port in port_range.0..=port_range.1 {
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
            debug!("bound loopback server on port {}", port);
            return Ok((listener, port));
        }
    }
    Err(GoogleError::configuration(format!(
        "no available loopback port in range {}-{}",
        port_range.0, port_range.1
    )))
}

/// Authorization code and state delivered to the loopback redirect.
#[derive(Debug, PartialEq, Eq)]
struct Callback {
    code: String,
    state: String,
}

/// Blocks until the browser hits `/callback` or `timeout` elapses.
fn wait_for_callback(listener: TcpListener, timeout: Duration) -> GoogleResult<Callback> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Some(result) = handle_callback(stream) {
                        let _ = tx.send(result);
                        return;
                    }
                }
                Err(e) => error!("failed to accept loopback connection: {}", e),
            }
        }
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(GoogleError::authorization(
            "timed out waiting for the user to approve access",
        )),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(GoogleError::authorization(
            "loopback listener stopped before receiving a callback",
        )),
    }
}

/// Handles one request on the loopback server.
///
/// Returns `None` for requests that are not the OAuth callback (the browser
/// may ask for `/favicon.ico` first).
fn handle_callback(mut stream: TcpStream) -> Option<GoogleResult<Callback>> {
    let mut request_line = String::new();
    BufReader::new(&stream).read_line(&mut request_line).ok()?;

    // GET /callback?code=...&state=... HTTP/1.1
    let mut parts = request_line.split_whitespace();
    if parts.next() != Some("GET") {
        return None;
    }
    let target = parts.next()?;
    if !target.starts_with("/callback") {
        return None;
    }

    let result = parse_callback_target(target);

    let response = match result {
        Ok(_) => {
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
            <html><body><h1>DrZob is authorized</h1>\
            <p>You can close this window.</p></body></html>"
        }
        Err(_) => {
            "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
            <html><body><h1>Authorization failed</h1>\
            <p>You can close this window.</p></body></html>"
        }
    };
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();

    Some(result)
}

fn parse_callback_target(target: &str) -> GoogleResult<Callback> {
    let url = Url::parse(&format!("http://127.0.0.1{}", target))
        .map_err(|e| GoogleError::authorization("malformed OAuth callback").with_source(e))?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => {
                return Err(GoogleError::authorization(format!(
                    "consent was not granted: {}",
                    value
                )));
            }
            _ => {}
        }
    }

    match code {
        Some(code) => Ok(Callback {
            code,
            state: state.unwrap_or_default(),
        }),
        None => Err(GoogleError::authorization(
            "OAuth callback carried no authorization code",
        )),
    }
}

/// PKCE verifier, challenge and CSRF state for one consent attempt
/// (RFC 7636).
#[derive(Debug)]
pub struct PkceFlow {
    pub verifier: String,
    /// Base64url SHA-256 of the verifier.
    pub challenge: String,
    pub state: String,
}

impl PkceFlow {
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(16),
        }
    }

    fn compute_challenge(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    /// Builds the consent URL.
    ///
    /// `include_granted_scopes` lets a later consent for another scope keep
    /// the scopes granted earlier under the same client.
    pub fn build_auth_url(
        &self,
        auth_endpoint: &str,
        client_id: &str,
        redirect_uri: &str,
        scopes: &ScopeSet,
    ) -> GoogleResult<Url> {
        let mut url = Url::parse(auth_endpoint).map_err(|e| {
            GoogleError::configuration(format!("invalid authorization endpoint '{}'", auth_endpoint))
                .with_source(e)
        })?;
        url.query_pairs_mut()
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &scopes.to_space_delimited())
            .append_pair("code_challenge", &self.challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("state", &self.state)
            .append_pair("access_type", "offline")
            .append_pair("include_granted_scopes", "true")
            .append_pair("prompt", "consent");
        Ok(url)
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CALENDAR: &str = "https://www.googleapis.com/auth/calendar";

    fn credentials() -> ClientCredentials {
        ClientCredentials::new("drzob.apps.googleusercontent.com", "s3cret")
    }

    fn client_for(server: &MockServer) -> OAuthClient {
        let endpoints = OAuthEndpoints {
            auth_url: format!("{}/auth", server.uri()),
            token_url: format!("{}/token", server.uri()),
        };
        OAuthClient::new(endpoints, (8080, 8090), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn pkce_verifier_length() {
        // 32 bytes base64url without padding
        assert_eq!(PkceFlow::new().verifier.len(), 43);
    }

    #[test]
    fn pkce_challenge_matches_rfc_example() {
        // RFC 7636 appendix B
        let challenge = PkceFlow::compute_challenge("dBjftJeZ4CVP-mJ92K1s8AX4ATRAzDb6Eg1QnRQ8a3o");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn pkce_state_is_random() {
        assert_ne!(PkceFlow::new().state, PkceFlow::new().state);
    }

    #[test]
    fn auth_url_carries_flow_parameters() {
        let flow = PkceFlow::new();
        let url = flow
            .build_auth_url(
                "https://accounts.google.com/o/oauth2/v2/auth",
                "drzob.apps.googleusercontent.com",
                "http://127.0.0.1:8080/callback",
                &ScopeSet::new([CALENDAR]),
            )
            .unwrap();

        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["client_id"], "drzob.apps.googleusercontent.com");
        assert_eq!(pairs["redirect_uri"], "http://127.0.0.1:8080/callback");
        assert_eq!(pairs["scope"], CALENDAR);
        assert_eq!(pairs["code_challenge"], flow.challenge);
        assert_eq!(pairs["code_challenge_method"], "S256");
        assert_eq!(pairs["state"], flow.state);
        assert_eq!(pairs["access_type"], "offline");
        assert_eq!(pairs["include_granted_scopes"], "true");
    }

    #[test]
    fn callback_target_parsing() {
        let ok = parse_callback_target("/callback?code=4%2Fabc&state=xyz").unwrap();
        assert_eq!(
            ok,
            Callback {
                code: "4/abc".to_string(),
                state: "xyz".to_string()
            }
        );

        let denied = parse_callback_target("/callback?error=access_denied").unwrap_err();
        assert_eq!(denied.kind(), ErrorKind::Authorization);
        assert!(denied.message().contains("access_denied"));

        assert!(parse_callback_target("/callback").is_err());
    }

    #[test]
    fn loopback_receives_callback() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let browser = thread::spawn(move || {
            let mut favicon = TcpStream::connect(("127.0.0.1", port)).unwrap();
            favicon
                .write_all(b"GET /favicon.ico HTTP/1.1\r\n\r\n")
                .unwrap();
            drop(favicon);

            let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
            stream
                .write_all(b"GET /callback?code=the-code&state=the-state HTTP/1.1\r\nHost: localhost\r\n\r\n")
                .unwrap();
            let mut reply = String::new();
            BufReader::new(stream).read_line(&mut reply).unwrap();
            reply
        });

        let callback = wait_for_callback(listener, Duration::from_secs(5)).unwrap();
        assert_eq!(callback.code, "the-code");
        assert_eq!(callback.state, "the-state");
        assert!(browser.join().unwrap().starts_with("HTTP/1.1 200"));
    }

    #[test]
    fn loopback_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let err = wait_for_callback(listener, Duration::from_millis(50)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn grant_conversion_keeps_previous_refresh_token() {
        let grant: TokenGrant =
            serde_json::from_str(r#"{"access_token": "new", "expires_in": 3599, "token_type": "Bearer"}"#)
                .unwrap();
        let token = grant.into_stored(&ScopeSet::new([CALENDAR]), Some("old-refresh".to_string()));

        assert_eq!(token.access_token, "new");
        assert_eq!(token.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(token.expires_in, Some(3599));
        assert!(token.scopes().contains(CALENDAR));
    }

    #[test]
    fn grant_conversion_prefers_granted_scopes() {
        let grant: TokenGrant = serde_json::from_str(
            r#"{"access_token": "a", "refresh_token": "r", "scope": "openid https://www.googleapis.com/auth/calendar"}"#,
        )
        .unwrap();
        let token = grant.into_stored(&ScopeSet::new(["ignored"]), None);
        assert_eq!(token.refresh_token.as_deref(), Some("r"));
        assert!(token.scopes().contains("openid"));
        assert!(!token.scopes().contains("ignored"));
    }

    #[test]
    fn oauth_error_descriptions() {
        assert_eq!(
            describe_oauth_error(r#"{"error": "invalid_grant", "error_description": "Bad Request"}"#),
            "invalid_grant (Bad Request)"
        );
        assert_eq!(describe_oauth_error(r#"{"error": "invalid_client"}"#), "invalid_client");
        assert_eq!(describe_oauth_error(" plain text "), "plain text");
    }

    #[tokio::test]
    async fn refresh_posts_refresh_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let grant = client_for(&server)
            .refresh(&credentials(), "refresh-1")
            .await
            .unwrap();
        assert_eq!(grant.access_token, "fresh");
        assert_eq!(grant.expires_in, Some(3599));
    }

    #[tokio::test]
    async fn rejected_refresh_is_authorization_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Token has been expired or revoked."
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .refresh(&credentials(), "revoked")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(err.message().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn code_exchange_sends_verifier() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code_verifier=the-verifier"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "a",
                "refresh_token": "r",
                "expires_in": 3599,
                "scope": CALENDAR
            })))
            .expect(1)
            .mount(&server)
            .await;

        let grant = client_for(&server)
            .exchange_code(
                &credentials(),
                "the-code",
                "the-verifier",
                "http://127.0.0.1:8080/callback",
            )
            .await
            .unwrap();
        assert_eq!(grant.refresh_token.as_deref(), Some("r"));
    }
}
