use std::path::{Path, PathBuf};

use crate::domain::{AppConfig, DomainError};

/// Port for reading and persisting the pipeline configuration.
pub trait ConfigStore: Send + Sync {
    /// Load the configuration from the default location.
    /// Writes a default file first if none exists.
    fn load(&self) -> Result<AppConfig, DomainError>;

    /// Load the configuration from an explicit file. The file must exist.
    fn load_from(&self, path: &Path) -> Result<AppConfig, DomainError>;

    /// Persist the configuration to the default location.
    fn save(&self, config: &AppConfig) -> Result<(), DomainError>;

    /// Default configuration file path.
    fn config_path(&self) -> PathBuf;

    /// Directory for rotated log files.
    fn logs_dir(&self) -> PathBuf;
}
