//! Application settings management

use crate::{PathManager, crypto};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_PORT: u16 = 3001;

/// Settings stored in settings.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Completion model used by the chat proxy (e.g. "gpt-4o-mini")
    pub model: Option<String>,
    /// Port the survey backend listens on
    pub port: Option<u16>,
    /// Override for the sqlite database location
    pub database_path: Option<PathBuf>,
    /// Encrypted API keys (provider name -> encrypted key)
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

impl Settings {
    /// Load settings from the settings file, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = PathManager::settings_path() else {
            return Self::default();
        };

        let Ok(content) = fs::read_to_string(&path) else {
            return Self::default();
        };

        toml::from_str(&content).unwrap_or_default()
    }

    /// Save settings to the settings file
    pub fn save(&self) -> Result<(), String> {
        let path = PathManager::settings_path().ok_or("Could not determine settings path")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config dir: {}", e))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;
        fs::write(&path, content).map_err(|e| format!("Failed to write settings: {}", e))?;
        Ok(())
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Get a decrypted API key for a provider.
    /// Returns None if not set or decryption fails.
    pub fn get_api_key(&self, provider: &str) -> Option<String> {
        self.api_keys
            .get(provider)
            .and_then(|encrypted| crypto::decrypt_string(encrypted).ok())
    }

    /// Set an API key for a provider (encrypts before storing).
    pub fn set_api_key(&mut self, provider: &str, api_key: &str) -> Result<(), String> {
        let encrypted = crypto::encrypt_string(api_key)?;
        self.api_keys.insert(provider.to_string(), encrypted);
        Ok(())
    }

    pub fn has_api_key(&self, provider: &str) -> bool {
        self.api_keys.contains_key(provider)
    }
}
