use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::PathBuf};

use crate::provider::ProviderId;

/// Key values that mean "no key": fresh installs and copied sample configs.
const PLACEHOLDER_KEYS: &[&str] = &["", "YOUR_API_KEY", "YOUR_API_KEY_HERE", "changeme"];

/// Configuration for a single provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Example TOML:
    /// [providers.openweather]
    /// api_key = "..."
    pub providers: HashMap<String, ProviderConfig>,

    /// Identifying User-Agent sent to the official-station API, which
    /// requires one. Overridable so deployments can set a contact address.
    pub user_agent: Option<String>,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weathermux", "weathermux")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set or replace a provider API key.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers.insert(provider_id.as_str().to_string(), ProviderConfig { api_key });
    }

    /// Snapshot of the key table taken once per resolution. A resolution in
    /// flight keeps the snapshot it started with even if the settings layer
    /// rewrites the file concurrently.
    pub fn key_store(&self) -> KeyStore {
        KeyStore {
            keys: self
                .providers
                .iter()
                .map(|(slug, cfg)| (slug.clone(), cfg.api_key.clone()))
                .collect(),
        }
    }
}

/// Read-only view of per-provider API keys used by every fetch attempt.
#[derive(Debug, Clone, Default)]
pub struct KeyStore {
    keys: HashMap<String, String>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, provider_id: ProviderId, api_key: impl Into<String>) -> Self {
        self.keys.insert(provider_id.as_str().to_string(), api_key.into());
        self
    }

    /// Returns a key only when one is present and is not a known placeholder.
    pub fn usable_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.keys
            .get(provider_id.as_str())
            .map(String::as_str)
            .filter(|k| !PLACEHOLDER_KEYS.contains(&k.trim()))
    }
}
