//! Core types: scopes, calendars, events, contacts, tracing setup

pub mod model;
pub mod scope;
pub mod tracing;

pub use model::{Calendar, CalendarEvent, Contact, EventId};
pub use scope::ScopeSet;
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
