//! Secret references in `config.toml`.
//!
//! Values for `client_id` and `client_secret` may point at a secret stored
//! outside the file:
//!
//! - `pass::path/in/store` runs `pass show path/in/store` and keeps the first line
//! - `env::VAR_NAME` reads `$VAR_NAME`
//! - anything else is used as-is

use std::fmt;
use std::process::Command;

use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// A parsed secret reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretRef<'a> {
    Pass(&'a str),
    Env(&'a str),
    Plain(&'a str),
}

impl<'a> SecretRef<'a> {
    pub fn parse(value: &'a str) -> Self {
        if let Some(path) = value.strip_prefix("pass::") {
            Self::Pass(path)
        } else if let Some(var) = value.strip_prefix("env::") {
            Self::Env(var)
        } else {
            Self::Plain(value)
        }
    }

    /// Returns true if the value is written inline in the config file.
    pub fn is_plain(&self) -> bool {
        matches!(self, Self::Plain(_))
    }

    pub fn resolve(&self) -> ClientResult<String> {
        match self {
            Self::Pass(path) => resolve_pass(path),
            Self::Env(var) => std::env::var(var)
                .map_err(|_| ClientError::Secret(format!("environment variable `{}` is not set", var))),
            Self::Plain(value) => Ok(value.to_string()),
        }
    }
}

impl fmt::Display for SecretRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass(path) => write!(f, "pass::{}", path),
            Self::Env(var) => write!(f, "env::{}", var),
            Self::Plain(_) => f.write_str("<redacted>"),
        }
    }
}

/// Resolves a value that may contain a secret reference prefix.
pub fn resolve(value: &str) -> ClientResult<String> {
    SecretRef::parse(value).resolve()
}

/// Runs `pass show <path>` and returns the first line of stdout.
fn resolve_pass(path: &str) -> ClientResult<String> {
    debug!("resolving secret from pass store entry {}", path);
    let output = Command::new("pass")
        .arg("show")
        .arg(path)
        .output()
        .map_err(|e| ClientError::Secret(format!("failed to run `pass show {}`: {}", path, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ClientError::Secret(format!(
            "`pass show {}` failed ({}): {}",
            path,
            output.status,
            stderr.trim()
        )));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| ClientError::Secret(format!("`pass show {}` produced no output", path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_prefixes() {
        assert_eq!(SecretRef::parse("pass::google/drzob"), SecretRef::Pass("google/drzob"));
        assert_eq!(SecretRef::parse("env::DRZOB_SECRET"), SecretRef::Env("DRZOB_SECRET"));
        assert_eq!(SecretRef::parse("env:DRZOB"), SecretRef::Plain("env:DRZOB"));
        assert!(SecretRef::parse("").is_plain());
    }

    #[test]
    fn display_hides_plain_values() {
        assert_eq!(SecretRef::parse("hunter2").to_string(), "<redacted>");
        assert_eq!(SecretRef::parse("env::X").to_string(), "env::X");
    }

    #[test]
    fn plain_text_passthrough() {
        assert_eq!(
            resolve("xxx.apps.googleusercontent.com").unwrap(),
            "xxx.apps.googleusercontent.com"
        );
        assert_eq!(resolve("").unwrap(), "");
    }

    #[test]
    fn env_prefix_resolves() {
        unsafe {
            std::env::set_var("_DRZOB_TEST_SECRET", "my-secret-value");
        }
        assert_eq!(resolve("env::_DRZOB_TEST_SECRET").unwrap(), "my-secret-value");
        unsafe {
            std::env::remove_var("_DRZOB_TEST_SECRET");
        }
    }

    #[test]
    fn env_prefix_missing_var_errors() {
        let err = resolve("env::_DRZOB_NONEXISTENT_VAR_12345").unwrap_err();
        assert!(err.to_string().contains("not set"));
    }

    #[test]
    fn pass_prefix_missing_entry_errors() {
        assert!(resolve("pass::nonexistent/drzob/entry/12345").is_err());
    }
}
