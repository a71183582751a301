//! Path resolution for iisprov
//!
//! # Environment Variables
//!
//! - `IISPROV_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/iisprov`)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `IISPROV_CONFIG_DIR` environment variable
//! 2. Platform config dir:
//!    - Windows: `%APPDATA%\iisprov`
//!    - macOS/Linux: `XDG_CONFIG_HOME/iisprov` or `~/.config/iisprov`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "IISPROV_CONFIG_DIR";

/// File name of the target file inside the config directory
pub const TARGETS_FILE: &str = "targets.toml";

/// Get the iisprov config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    let base = dirs::config_dir().context("Could not determine config directory")?;
    let path = base.join("iisprov");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Default location of the target file
pub fn targets_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(TARGETS_FILE))
}

/// Expand ~ and environment variables in a path string.
///
/// Unresolvable variables leave the input unchanged.
///
/// ```
/// let home_path = paths::expand("~/sites/shop");
/// let var_path = paths::expand("%SYSTEMDRIVE%/inetpub");
/// ```
pub fn expand(path: &str) -> PathBuf {
    PathBuf::from(expand_str(path))
}

/// [`expand`], keeping the result as a string.
pub fn expand_str(path: &str) -> String {
    shellexpand::full(path)
        .map(|expanded| expanded.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

// ============================================================================
// Tests
// ============================================================================
