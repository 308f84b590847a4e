//! Composite list configuration.
//!
//! [`CompositeConfig`] is plain serde data, so it can live in an application's
//! settings file:
//!
//! ```
//! use horizon_weave::config::{CompositeConfig, RelayMode};
//!
//! let config = CompositeConfig::from_toml_str(r#"
//!     hide_titles_when_empty = true
//!     relay_mode = "full-diff"
//! "#).unwrap();
//!
//! assert!(config.hide_titles_when_empty);
//! assert_eq!(config.relay_mode, RelayMode::FullDiff);
//! assert!(config.detect_moves);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How provider mutation events reach the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelayMode {
    /// Remap each local event to flattened positions and forward it.
    #[default]
    Incremental,
    /// Rebuild and diff on every event.
    FullDiff,
}

/// Options for a [`CompositeList`](crate::compose::CompositeList).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeConfig {
    /// Skip the section title of a provider that has no items.
    pub hide_titles_when_empty: bool,
    /// Show the trailing pending row.
    pub pending: bool,
    /// How provider events are forwarded.
    pub relay_mode: RelayMode,
    /// Pair removed and inserted items with the same identity into moves.
    pub detect_moves: bool,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            hide_titles_when_empty: false,
            pending: false,
            relay_mode: RelayMode::Incremental,
            detect_moves: true,
        }
    }
}

impl CompositeConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Serializes the configuration to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Sets whether titles of empty providers are hidden.
    pub fn with_hide_titles_when_empty(mut self, hide: bool) -> Self {
        self.hide_titles_when_empty = hide;
        self
    }

    /// Sets the initial pending state.
    pub fn with_pending(mut self, pending: bool) -> Self {
        self.pending = pending;
        self
    }

    /// Sets the relay mode.
    pub fn with_relay_mode(mut self, mode: RelayMode) -> Self {
        self.relay_mode = mode;
        self
    }

    /// Sets whether the diff engine detects moves.
    pub fn with_detect_moves(mut self, detect_moves: bool) -> Self {
        self.detect_moves = detect_moves;
        self
    }
}
