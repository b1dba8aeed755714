//! Calendar, event and contact values exchanged with the remote services.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A calendar visible to the authorized account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    /// Opaque calendar identifier used in API paths.
    pub id: String,
    /// The name shown to the user (the API's `summary`).
    pub display_name: String,
}

impl Calendar {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// An event to be inserted into a calendar.
///
/// Events have no identity until the remote service assigns one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub summary: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CalendarEvent {
    /// Builds an event whose summary and description are both `description`.
    pub fn new(description: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let description = description.into();
        Self {
            summary: description.clone(),
            description,
            start,
            end,
        }
    }

    /// Returns true if the event ends strictly after it starts.
    pub fn has_valid_range(&self) -> bool {
        self.start < self.end
    }
}

/// Identifier assigned to an event by the calendar service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A contact from the user's address book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// The contact's full display name, when the service has one.
    pub full_name: Option<String>,
}

impl Contact {
    pub fn named(full_name: impl Into<String>) -> Self {
        Self {
            full_name: Some(full_name.into()),
        }
    }

    /// Returns the full name, or an empty string for unnamed contacts.
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or_default()
    }
}
