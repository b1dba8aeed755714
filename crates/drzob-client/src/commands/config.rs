//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dumps the effective configuration to stdout.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    let effective = config.effective()?;
    let toml_str = toml::to_string_pretty(&effective)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);
    Ok(())
}

/// Shows the configuration file path.
pub fn path(path: &Path) -> ClientResult<()> {
    let marker = if path.exists() { "" } else { " (not found)" };
    println!("config: {}{}", path.display(), marker);
    Ok(())
}
