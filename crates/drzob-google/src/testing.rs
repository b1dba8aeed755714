//! In-memory doubles for the remote services and the credential store.
//!
//! Every double counts its calls so tests can assert that a code path did
//! not reach the network or the store.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use drzob_core::{Calendar, CalendarEvent, Contact, EventId, ScopeSet};

use crate::api::{BoxFuture, CalendarApi, ContactsApi};
use crate::authorize::AuthorizedSession;
use crate::config::ClientCredentials;
use crate::error::{GoogleError, GoogleResult};
use crate::oauth::{AuthorizationServer, TokenGrant};
use crate::store::{CredentialStore, StoredToken};

/// [`CalendarApi`] serving a fixed calendar list and recording insertions.
#[derive(Debug)]
pub struct RecordingCalendarApi {
    calendars: Vec<Calendar>,
    event_id: EventId,
    list_calls: AtomicUsize,
    inserted: Mutex<Vec<(String, CalendarEvent)>>,
}

impl RecordingCalendarApi {
    pub fn new(calendars: Vec<Calendar>) -> Self {
        Self {
            calendars,
            event_id: EventId::new("drzob-event-1"),
            list_calls: AtomicUsize::new(0),
            inserted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_event_id(mut self, id: impl Into<String>) -> Self {
        self.event_id = EventId::new(id);
        self
    }

    /// The id returned for every insertion.
    pub fn event_id(&self) -> EventId {
        self.event_id.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Calendar ids and events passed to `insert_event`, in call order.
    pub fn inserted(&self) -> Vec<(String, CalendarEvent)> {
        self.inserted.lock().unwrap().clone()
    }
}

impl CalendarApi for RecordingCalendarApi {
    fn list_calendars<'a>(
        &'a self,
        _session: &'a AuthorizedSession,
    ) -> BoxFuture<'a, GoogleResult<Vec<Calendar>>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let calendars = self.calendars.clone();
        Box::pin(async move { Ok(calendars) })
    }

    fn insert_event<'a>(
        &'a self,
        _session: &'a AuthorizedSession,
        calendar_id: &'a str,
        event: &'a CalendarEvent,
    ) -> BoxFuture<'a, GoogleResult<EventId>> {
        self.inserted
            .lock()
            .unwrap()
            .push((calendar_id.to_string(), event.clone()));
        let id = self.event_id.clone();
        Box::pin(async move { Ok(id) })
    }
}

/// [`ContactsApi`] serving a fixed contact list.
#[derive(Debug)]
pub struct StaticContactsApi {
    contacts: Vec<Contact>,
    calls: AtomicUsize,
}

impl StaticContactsApi {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self {
            contacts,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ContactsApi for StaticContactsApi {
    fn list_contacts<'a>(
        &'a self,
        _session: &'a AuthorizedSession,
    ) -> BoxFuture<'a, GoogleResult<Vec<Contact>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let contacts = self.contacts.clone();
        Box::pin(async move { Ok(contacts) })
    }
}

/// [`AuthorizationServer`] answering from a script instead of Google.
///
/// Consent grants the requested scopes with access token `access_token` and
/// refresh token `refresh-<access_token>`. Refresh returns access token
/// `refreshed` without a new refresh token.
#[derive(Debug)]
pub struct ScriptedAuthorizationServer {
    access_token: Option<String>,
    refresh_fails: bool,
    consent_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    consent_scopes: Mutex<Vec<ScopeSet>>,
}

impl ScriptedAuthorizationServer {
    /// A server whose consent succeeds.
    pub fn granting(access_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_fails: false,
            consent_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            consent_scopes: Mutex::new(Vec::new()),
        }
    }

    /// A server where the user denies consent.
    pub fn denying() -> Self {
        Self {
            access_token: None,
            ..Self::granting("")
        }
    }

    pub fn with_failing_refresh(mut self) -> Self {
        self.refresh_fails = true;
        self
    }

    pub fn consent_calls(&self) -> usize {
        self.consent_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Scope sets passed to `request_consent`, in call order.
    pub fn consent_scopes(&self) -> Vec<ScopeSet> {
        self.consent_scopes.lock().unwrap().clone()
    }
}

impl AuthorizationServer for ScriptedAuthorizationServer {
    fn request_consent<'a>(
        &'a self,
        _credentials: &'a ClientCredentials,
        scopes: &'a ScopeSet,
    ) -> BoxFuture<'a, GoogleResult<TokenGrant>> {
        self.consent_calls.fetch_add(1, Ordering::SeqCst);
        self.consent_scopes.lock().unwrap().push(scopes.clone());

        let result = match &self.access_token {
            Some(access) => Ok(TokenGrant {
                access_token: access.clone(),
                refresh_token: Some(format!("refresh-{}", access)),
                expires_in: Some(3600),
                scope: Some(scopes.to_space_delimited()),
                token_type: Some("Bearer".to_string()),
            }),
            None => Err(GoogleError::authorization(
                "consent was not granted: access_denied",
            )),
        };
        Box::pin(async move { result })
    }

    fn refresh<'a>(
        &'a self,
        _credentials: &'a ClientCredentials,
        _refresh_token: &'a str,
    ) -> BoxFuture<'a, GoogleResult<TokenGrant>> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);

        let result = if self.refresh_fails {
            Err(GoogleError::authorization(
                "token refresh rejected (400 Bad Request): invalid_grant",
            ))
        } else {
            Ok(TokenGrant {
                access_token: "refreshed".to_string(),
                refresh_token: None,
                expires_in: Some(3600),
                scope: None,
                token_type: Some("Bearer".to_string()),
            })
        };
        Box::pin(async move { result })
    }
}

/// [`CredentialStore`] wrapper counting reads and writes.
#[derive(Debug)]
pub struct CountingStore<S> {
    inner: S,
    loads: AtomicUsize,
    saves: AtomicUsize,
}

impl<S: CredentialStore> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            loads: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl<S: CredentialStore> CredentialStore for CountingStore<S> {
    fn load(&self, key: &str) -> GoogleResult<Option<StoredToken>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(key)
    }

    fn save(&self, key: &str, token: &StoredToken) -> GoogleResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(key, token)
    }

    fn delete(&self, key: &str) -> GoogleResult<bool> {
        self.inner.delete(key)
    }

    fn describe(&self, key: &str) -> String {
        self.inner.describe(key)
    }
}

/// [`CredentialStore`] wrapper that sleeps before every read.
#[derive(Debug)]
pub struct SlowStore<S> {
    inner: S,
    delay: Duration,
}

impl<S: CredentialStore> SlowStore<S> {
    pub fn new(inner: S, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

impl<S: CredentialStore> CredentialStore for SlowStore<S> {
    fn load(&self, key: &str) -> GoogleResult<Option<StoredToken>> {
        std::thread::sleep(self.delay);
        self.inner.load(key)
    }

    fn save(&self, key: &str, token: &StoredToken) -> GoogleResult<()> {
        self.inner.save(key, token)
    }

    fn delete(&self, key: &str) -> GoogleResult<bool> {
        self.inner.delete(key)
    }

    fn describe(&self, key: &str) -> String {
        self.inner.describe(key)
    }
}
