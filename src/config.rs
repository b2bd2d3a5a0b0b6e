use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::constants::config::{APP_DIR, ENV_INITIAL_MODE, ENV_STORE_DIR, FILENAME};
use crate::mode::InitialMode;

/// Application settings, stored as JSON next to other user config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Mode to open in when a saved profile exists
    #[serde(default = "default_initial_mode")]
    pub initial_mode: InitialMode,

    /// Where profile data lives. `None` means the platform data dir.
    #[serde(default = "default_store_dir", skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_initial_mode() -> InitialMode {
    InitialMode::View
}

fn default_store_dir() -> Option<PathBuf> {
    None
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            initial_mode: default_initial_mode(),
            store_dir: default_store_dir(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    pub fn path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        path.push(FILENAME);
        path
    }

    /// Load from the default location, creating the file if missing,
    /// then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::path())?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "Config file not found, creating default");
            let config = Self::default();
            if let Err(e) = config.save_to(path) {
                // Still usable without a file on disk
                error!(error = ?e, "Failed to write default config");
            }
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let mut config: AppConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config JSON from {}", path.display()))?;
        config.validate_and_clamp();

        info!(path = %path.display(), initial_mode = ?config.initial_mode, "Loaded config");
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        fs::write(path, json).with_context(|| format!("Failed to write config to {}", path.display()))?;
        info!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Resolved directory for the profile store
    pub fn store_dir(&self) -> PathBuf {
        self.store_dir.clone().unwrap_or_else(|| {
            let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
            path.push(APP_DIR);
            path
        })
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(env::var(ENV_STORE_DIR).ok(), env::var(ENV_INITIAL_MODE).ok());
    }

    fn apply_overrides(&mut self, store_dir: Option<String>, initial_mode: Option<String>) {
        if let Some(dir) = store_dir.filter(|d| !d.trim().is_empty()) {
            info!(store_dir = %dir, "Store directory overridden from environment");
            self.store_dir = Some(PathBuf::from(dir));
        }

        if let Some(raw) = initial_mode {
            match raw.parse::<InitialMode>() {
                Ok(mode) => {
                    info!(initial_mode = ?mode, "Initial mode overridden from environment");
                    self.initial_mode = mode;
                }
                Err(e) => warn!(value = %raw, error = %e, "Ignoring invalid initial mode override"),
            }
        }
    }

    fn validate_and_clamp(&mut self) {
        let level = self.log_level.to_lowercase();
        if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
            warn!(log_level = %self.log_level, using = %default_log_level(), "Unknown log_level, using default");
            self.log_level = default_log_level();
        }
    }
}
