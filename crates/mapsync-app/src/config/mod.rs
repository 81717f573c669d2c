//! Configuration file parsing for mapsync
//!
//! Supports:
//! - `.mapsync/config.toml` - Fragment persistence and map settings

pub mod settings;
pub mod types;

pub use settings::{init_config_dir, load_settings};
pub use types::*;
