//! Configuration for the file tree engine.
//!
//! All timings are stored in milliseconds so the config round-trips through
//! TOML unchanged; the accessors return [`Duration`]s.
//!
//! # Examples
//!
//! ```
//! use filetree_core::TreeConfig;
//! use std::time::Duration;
//!
//! // Use default configuration
//! let config = TreeConfig::default();
//! assert_eq!(config.render_delay(), Duration::from_millis(100));
//! assert!((config.item_height - 22.0).abs() < f64::EPSILON);
//!
//! // Override a single field
//! let compact = TreeConfig {
//!     compact_folders: true,
//!     ..Default::default()
//! };
//! assert!(compact.validate().is_ok());
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine configuration.
///
/// Missing fields take their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Fold chains of single-child directories into one node.
    ///
    /// Default: false
    pub compact_folders: bool,

    /// Window in which structural updates coalesce into one render.
    ///
    /// Default: 100
    pub render_delay_ms: u64,

    /// Delay before queued refresh requests are flushed.
    ///
    /// Default: 500
    pub refresh_flush_delay_ms: u64,

    /// Throttle window of location requests; only the last one survives.
    ///
    /// Default: 200
    pub location_delay_ms: u64,

    /// Hover time after which a collapsed drop target expands.
    ///
    /// Default: 500
    pub drag_hover_expand_delay_ms: u64,

    /// Height of one row, in pixels.
    ///
    /// Default: 22.0
    pub item_height: f64,

    /// Height of the visible area, in pixels. Zero means unknown.
    ///
    /// Default: 0.0
    pub viewport_height: f64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            compact_folders: false,
            render_delay_ms: 100,
            refresh_flush_delay_ms: 500,
            location_delay_ms: 200,
            drag_hover_expand_delay_ms: 500,
            item_height: 22.0,
            viewport_height: 0.0,
        }
    }
}

impl TreeConfig {
    /// Coalescing window of render notifications.
    #[must_use]
    pub const fn render_delay(&self) -> Duration {
        Duration::from_millis(self.render_delay_ms)
    }

    /// Flush delay of the refresh queue.
    #[must_use]
    pub const fn refresh_flush_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_flush_delay_ms)
    }

    /// Throttle window of location requests.
    #[must_use]
    pub const fn location_delay(&self) -> Duration {
        Duration::from_millis(self.location_delay_ms)
    }

    /// Hover-expand delay during drag and drop.
    #[must_use]
    pub const fn drag_hover_expand_delay(&self) -> Duration {
        Duration::from_millis(self.drag_hover_expand_delay_ms)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the item height is not a positive
    /// finite number or the viewport height is negative.
    ///
    /// # Examples
    ///
    /// ```
    /// use filetree_core::TreeConfig;
    ///
    /// let broken = TreeConfig {
    ///     item_height: 0.0,
    ///     ..Default::default()
    /// };
    /// assert!(broken.validate().unwrap_err().is_config_error());
    /// ```
    pub fn validate(&self) -> Result<()> {
        if !self.item_height.is_finite() || self.item_height <= 0.0 {
            return Err(Error::ConfigError {
                message: format!("item_height must be positive, got {}", self.item_height),
            });
        }
        if !self.viewport_height.is_finite() || self.viewport_height < 0.0 {
            return Err(Error::ConfigError {
                message: format!(
                    "viewport_height must not be negative, got {}",
                    self.viewport_height
                ),
            });
        }
        Ok(())
    }
}
