//! Settings parser for .mapsync/config.toml

use super::types::Settings;
use mapsync_core::prelude::*;
use std::path::Path;

const CONFIG_FILENAME: &str = "config.toml";
const MAPSYNC_DIR: &str = ".mapsync";

/// Load settings from `.mapsync/config.toml` under `project_path`.
///
/// A missing or unreadable file yields the defaults.
pub fn load_settings(project_path: &Path) -> Settings {
    let config_path = project_path.join(MAPSYNC_DIR).join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Create a commented default config in `.mapsync/`. Existing files are kept.
pub fn init_config_dir(project_path: &Path) -> Result<()> {
    let mapsync_dir = project_path.join(MAPSYNC_DIR);

    if !mapsync_dir.exists() {
        std::fs::create_dir_all(&mapsync_dir)
            .map_err(|e| Error::config(format!("Failed to create .mapsync dir: {}", e)))?;
    }

    let config_path = mapsync_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        let default_content = r#"# mapsync configuration

[fragment]
debounce_ms = 1000      # At most one debounced fragment write per window
edge = "trailing"       # "trailing" writes the latest value when the window closes,
                        # "leading" also writes the first request immediately
# file = "fragment.txt" # Persist the fragment to this file

[map]
default_layer = "awmc"  # Base layer left out of the fragment
"#;
        std::fs::write(&config_path, default_content)
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
        info!("Created default config at {:?}", config_path);
    }

    Ok(())
}
