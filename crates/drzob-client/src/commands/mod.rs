//! Command handlers.

pub mod calendar;
pub mod config;
pub mod contacts;
pub mod status;
