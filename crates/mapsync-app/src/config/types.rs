//! Configuration types for mapsync
//!
//! Defines `Settings` (`.mapsync/config.toml`) and its sections.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::writer::DEFAULT_DEBOUNCE_MS;

/// Name of the base layer that is never written to the fragment
pub const DEFAULT_LAYER: &str = "awmc";

/// Application settings (.mapsync/config.toml)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub fragment: FragmentSettings,

    #[serde(default)]
    pub map: MapSettings,
}

impl Settings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.fragment.debounce_ms)
    }
}

/// Which edge of the debounce window performs the write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DebounceEdge {
    /// Write the first request at once, then the latest one when the window closes
    Leading,
    /// Write only the latest request, when the window closes
    #[default]
    Trailing,
}

impl std::fmt::Display for DebounceEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DebounceEdge::Leading => write!(f, "leading"),
            DebounceEdge::Trailing => write!(f, "trailing"),
        }
    }
}

/// Fragment persistence settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FragmentSettings {
    /// Debounce window in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Debounce edge: "trailing" (default) or "leading"
    #[serde(default)]
    pub edge: DebounceEdge,

    /// File the fragment is persisted to (None = stdout only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for FragmentSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            edge: DebounceEdge::default(),
            file: None,
        }
    }
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

/// Map settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MapSettings {
    /// Base layer omitted from the fragment
    #[serde(default = "default_layer")]
    pub default_layer: String,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            default_layer: default_layer(),
        }
    }
}

fn default_layer() -> String {
    DEFAULT_LAYER.to_string()
}
