//! Seams between the operations and the remote Google services.
//!
//! The Calendar and Contacts operations only see these traits. The
//! network-backed implementations live in [`crate::client`]; recording doubles
//! for tests live in [`crate::testing`].

use std::future::Future;
use std::pin::Pin;

use drzob_core::{Calendar, CalendarEvent, Contact, EventId};

use crate::authorize::AuthorizedSession;
use crate::error::GoogleResult;

/// A boxed future, keeping the traits object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Calendar v3 calls used by the Calendar Operation.
pub trait CalendarApi: Send + Sync {
    /// Lists every calendar visible to the session's account, across pages.
    fn list_calendars<'a>(
        &'a self,
        session: &'a AuthorizedSession,
    ) -> BoxFuture<'a, GoogleResult<Vec<Calendar>>>;

    /// Inserts `event` into the calendar `calendar_id` and returns the id the
    /// service assigned.
    fn insert_event<'a>(
        &'a self,
        session: &'a AuthorizedSession,
        calendar_id: &'a str,
        event: &'a CalendarEvent,
    ) -> BoxFuture<'a, GoogleResult<EventId>>;
}

/// Contacts calls used by the Contacts Operation.
pub trait ContactsApi: Send + Sync {
    /// Fetches every contact of the session's account in service order.
    fn list_contacts<'a>(
        &'a self,
        session: &'a AuthorizedSession,
    ) -> BoxFuture<'a, GoogleResult<Vec<Contact>>>;
}
