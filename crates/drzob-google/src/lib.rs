//! Google authorization and the two DrZob operations.
//!
//! - [`Authorizer`] turns [`ClientCredentials`] into an [`AuthorizedSession`],
//!   reusing, refreshing or re-consenting the token cached under a store key
//! - [`calendar::insert_event`] adds an event to the calendar with a given
//!   display name
//! - [`contacts::list_contact_names`] enumerates the user's contacts
//!
//! The operations talk to Google through the [`CalendarApi`] and
//! [`ContactsApi`] traits; [`client`] holds the REST implementations and
//! [`testing`] the in-memory doubles (`test-util` feature).
//!
//! ```ignore
//! use std::sync::Arc;
//! use drzob_google::*;
//!
//! let config = GoogleConfig::new();
//! let authorizer = Authorizer::new(
//!     Arc::new(FileTokenStore::new(&config.token_dir)),
//!     Arc::new(OAuthClient::new(config.endpoints.clone(), config.loopback_port_range, config.timeout)?),
//! );
//! let scopes = ScopeSet::new([CALENDAR_SCOPE]);
//! let session = authorizer.authorize(&credentials, &scopes, &config.store_key).await?;
//! let api = GoogleCalendarClient::new(&config.calendar_api_base, config.timeout)?;
//! let (start, end) = calendar::todays_window(4, 6)?;
//! let event = CalendarEvent::new(DEFAULT_EVENT_DESCRIPTION, start, end);
//! let id = calendar::insert_event(&api, &session, &config.calendar_name, &event).await?;
//! ```

pub mod api;
pub mod authorize;
pub mod calendar;
pub mod client;
pub mod config;
pub mod contacts;
pub mod error;
pub mod oauth;
pub mod store;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use api::{BoxFuture, CalendarApi, ContactsApi};
pub use authorize::{AuthorizedSession, Authorizer, DEFAULT_PROBE_WAIT, has_stored_token};
pub use calendar::DEFAULT_EVENT_DESCRIPTION;
pub use client::{GoogleCalendarClient, GooglePeopleClient};
pub use config::{
    CALENDAR_SCOPE, CONTACTS_SCOPE, ClientCredentials, DEFAULT_CALENDAR_NAME, DEFAULT_STORE_KEY,
    GoogleConfig, OAuthEndpoints,
};
pub use contacts::ContactNames;
pub use drzob_core::{Calendar, CalendarEvent, Contact, EventId, ScopeSet};
pub use error::{ErrorKind, GoogleError, GoogleResult};
pub use oauth::{AuthorizationServer, OAuthClient, TokenGrant};
pub use store::{CredentialStore, FileTokenStore, MemoryTokenStore, StoredToken};
