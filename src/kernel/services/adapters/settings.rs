use std::path::{Path, PathBuf};

use super::paths::{get_config_dir, APP_NAME};
use crate::kernel::services::ports::settings::Settings;

const SETTINGS_FILE: &str = "settings.json";

pub fn get_settings_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(APP_NAME).join(SETTINGS_FILE))
}

pub fn ensure_settings_file() -> std::io::Result<PathBuf> {
    let path = get_settings_path().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Cannot determine settings directory",
        )
    })?;
    write_default_settings(&path)?;
    Ok(path)
}

/// Writes default settings to `path` unless a file is already there.
pub fn write_default_settings(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    if !path.exists() {
        let content =
            serde_json::to_string_pretty(&Settings::default()).unwrap_or_else(|_| "{}".to_string());
        std::fs::write(path, content)?;
    }
    Ok(())
}

/// Settings from the user settings file, or defaults when it is missing or malformed.
pub fn load_settings() -> Settings {
    match get_settings_path() {
        Some(path) => load_settings_from(&path),
        None => Settings::default(),
    }
}

pub fn load_settings_from(path: &Path) -> Settings {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(_) => return Settings::default(),
    };
    match serde_json::from_str(&data) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "invalid settings; using defaults");
            Settings::default()
        }
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/settings.rs"]
mod tests;
