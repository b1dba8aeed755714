//! The `drzob` command-line client.
//!
//! Gathers client credentials, runs one Google action per invocation and
//! reports the outcome.

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod secret;

pub use cli::Cli;
pub use context::AppContext;
pub use error::{ClientError, ClientResult};
