//! Engine configuration loaded from TOML.
//!
//! Configuration is read from `--config` when given, else from:
//! - Linux: `~/.config/filetree/config.toml`
//! - macOS: `~/Library/Application Support/filetree/config.toml`
//! - Windows: `%APPDATA%\filetree\config.toml`
//!
//! Missing keys take their defaults:
//!
//! ```toml
//! compact_folders = true
//! render_delay_ms = 100
//! refresh_flush_delay_ms = 500
//! location_delay_ms = 200
//! drag_hover_expand_delay_ms = 500
//! item_height = 22.0
//! viewport_height = 0.0
//! ```

use anyhow::{Context, Result};
use filetree_core::TreeConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default location of the configuration file.
///
/// # Errors
///
/// Returns an error if the platform config directory cannot be determined.
pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().context("failed to determine config directory")?;
    Ok(config_dir.join("filetree").join("config.toml"))
}

/// Parses and validates a TOML configuration.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or the values are invalid.
///
/// # Examples
///
/// ```
/// use filetree_cli::config::parse_config;
///
/// let config = parse_config("compact_folders = true").unwrap();
/// assert!(config.compact_folders);
/// assert_eq!(config.location_delay_ms, 200);
///
/// assert!(parse_config("item_height = -1.0").is_err());
/// ```
pub fn parse_config(content: &str) -> Result<TreeConfig> {
    let config: TreeConfig = toml::from_str(content).context("failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Loads the configuration.
///
/// An explicit `path` must exist. Without one, the default file is used
/// if present and the built-in defaults otherwise.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is invalid.
pub fn load_config(path: Option<&Path>) -> Result<TreeConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let path = default_config_path()?;
            if !path.exists() {
                debug!("config file not found, using defaults");
                return Ok(TreeConfig::default());
            }
            path
        }
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config = parse_config(&content)?;
    debug!("loaded config from {}", path.display());
    Ok(config)
}

/// Writes `config` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error if the config is invalid or cannot be written.
pub fn save_config(path: &Path, config: &TreeConfig) -> Result<()> {
    config.validate()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    let toml_str = toml::to_string_pretty(config).context("failed to serialize config")?;
    fs::write(path, toml_str).context("failed to write config file")?;

    debug!("saved config to {}", path.display());
    Ok(())
}
