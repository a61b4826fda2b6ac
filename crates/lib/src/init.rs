//! Initialize the configuration directory: create ~/.relay and a default config.json.
//!
//! The seeded config lists the three reference personas with placeholder addresses
//! so the operator only has to fill in real destination identifiers.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::{Config, PersonaRoute};

/// Config written by `relay init`.
pub fn default_seed_config() -> Config {
    let persona = |name: &str, address: &str, path: &str, voice_path: &str| PersonaRoute {
        name: name.to_string(),
        address: address.to_string(),
        path: path.to_string(),
        voice_path: Some(voice_path.to_string()),
    };
    Config {
        personas: vec![
            persona("maya", "10000000001@c.us", "api/maya/chat", "api/chat/transcribe"),
            persona("samantha", "10000000002@c.us", "api/samantha/chat", "api/chat/transcribe"),
            persona("journal", "10000000003@c.us", "api/journal/chat", "api/chat/transcribe"),
        ],
        ..Config::default()
    }
}

/// Create the config directory and write the seed config if no config file exists yet.
/// An existing config file is left untouched.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        let seed = serde_json::to_string_pretty(&default_seed_config())
            .context("serializing default config")?;
        std::fs::write(config_path, seed)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    } else {
        log::debug!("config already exists at {}, skipping", config_path.display());
    }

    Ok(config_dir.to_path_buf())
}
