//! Logging setup shared by the drzob crates.
//!
//! The CLI calls [`init_tracing`] once at startup. `RUST_LOG` always wins
//! over the configured level; otherwise the level applies to the drzob crates
//! only, so dependency chatter (reqwest, hyper) stays quiet.
//!
//! ```ignore
//! use drzob_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::cli_debug())?;
//! ```

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

/// Crate targets that receive the configured default level.
const DRZOB_TARGETS: &[&str] = &["drzob", "drzob_core", "drzob_google", "drzob_client"];

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Multi-line human-readable output.
    Pretty,
    /// Single-line output, the CLI default.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

/// Configuration for [`init_tracing`].
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level used for the drzob crates when `RUST_LOG` is unset.
    pub default_level: Level,
    pub output_format: TracingOutputFormat,
    /// Include file and line of the call site.
    pub include_location: bool,
    /// Include the module path of the call site.
    pub include_target: bool,
    pub include_timestamp: bool,
    /// Emit span open/close events.
    pub include_span_events: bool,
    /// Explicit filter directive, overriding both `RUST_LOG` and the level.
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::WARN,
            output_format: TracingOutputFormat::Compact,
            include_location: false,
            include_target: false,
            include_timestamp: false,
            include_span_events: false,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Verbose configuration for `--debug`.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            default_level: Level::DEBUG,
            include_location: true,
            include_target: true,
            include_timestamp: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Builds the filter directive applied when neither `env_filter` nor
    /// `RUST_LOG` is set.
    pub fn default_directive(&self) -> String {
        DRZOB_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, self.default_level))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn build_filter(&self) -> Result<EnvFilter, TracingError> {
        if let Some(ref directive) = self.env_filter {
            return Ok(EnvFilter::try_new(directive)?);
        }
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => Ok(EnvFilter::try_new(self.default_directive())?),
        }
    }
}

/// Installs the global subscriber described by `config`.
///
/// # Errors
///
/// Fails if a global subscriber is already installed or a filter directive
/// does not parse.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let filter = config.build_filter()?;
    let span_events = if config.include_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_target(config.include_target)
        .with_span_events(span_events);

    let layer = match (config.output_format, config.include_timestamp) {
        (TracingOutputFormat::Pretty, true) => base.pretty().boxed(),
        (TracingOutputFormat::Pretty, false) => base.pretty().without_time().boxed(),
        (TracingOutputFormat::Compact, true) => base.compact().boxed(),
        (TracingOutputFormat::Compact, false) => base.compact().without_time().boxed(),
        (TracingOutputFormat::Json, _) => base.json().boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
