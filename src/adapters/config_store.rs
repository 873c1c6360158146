use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::domain::{AppConfig, DomainError};
use crate::ports::ConfigStore;

const APP_DIR: &str = "vidsum";

/// TOML-based configuration store with OS-specific paths.
pub struct TomlConfigStore {
    config_dir: PathBuf,
    logs_dir: PathBuf,
}

impl TomlConfigStore {
    /// Create a store rooted at the OS configuration directory.
    /// - macOS: ~/Library/Application Support/vidsum/
    /// - Windows: %APPDATA%\vidsum\
    /// - Linux: ~/.config/vidsum/
    pub fn new() -> Result<Self, DomainError> {
        let config_dir = dirs::config_dir()
            .map(|p| p.join(APP_DIR))
            .ok_or_else(|| DomainError::Config("Could not find configuration directory".to_string()))?;
        let logs_dir = dirs::data_local_dir()
            .map(|p| p.join(APP_DIR).join("logs"))
            .unwrap_or_else(|| config_dir.join("logs"));

        fs::create_dir_all(&config_dir)?;
        info!(config_dir = ?config_dir, "ConfigStore initialized");

        Ok(Self {
            config_dir,
            logs_dir,
        })
    }

    /// Create a store that keeps everything under one directory.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        let config_dir = dir.into();
        let logs_dir = config_dir.join("logs");
        Self {
            config_dir,
            logs_dir,
        }
    }

    fn parse(path: &Path) -> Result<AppConfig, DomainError> {
        let content = fs::read_to_string(path)
            .map_err(|e| DomainError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

impl ConfigStore for TomlConfigStore {
    fn load(&self) -> Result<AppConfig, DomainError> {
        let config_path = self.config_path();

        if config_path.exists() {
            debug!(path = ?config_path, "Loading configuration");
            let config = Self::parse(&config_path)?;
            info!(path = ?config_path, "Configuration loaded");
            Ok(config)
        } else {
            info!(path = ?config_path, "Configuration file not found, creating default");
            let config = AppConfig::new();
            self.save(&config)?;
            Ok(config)
        }
    }

    fn load_from(&self, path: &Path) -> Result<AppConfig, DomainError> {
        let config = Self::parse(path)?;
        info!(path = ?path, "Configuration loaded");
        Ok(config)
    }

    fn save(&self, config: &AppConfig) -> Result<(), DomainError> {
        let config_path = self.config_path();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&config_path, content)?;

        info!(path = ?config_path, "Configuration saved");
        Ok(())
    }

    fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    fn logs_dir(&self) -> PathBuf {
        self.logs_dir.clone()
    }
}
