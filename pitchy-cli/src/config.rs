//! Configuration management

use anyhow::{Context, Result};
use pitchy_session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Path the configuration was loaded from
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Audio device index (None = default device)
    pub device_index: Option<usize>,

    /// Where recordings are written (None = `<data_dir>/recordings`)
    pub recordings_dir: Option<PathBuf>,

    /// Capture session settings
    pub session: SessionConfig,
}

impl CliConfig {
    /// Load configuration from `path`, writing the defaults there if it is missing
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;

            let mut config: CliConfig = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;

            config.config_path = path.to_path_buf();
            Ok(config)
        } else {
            let config = Self {
                config_path: path.to_path_buf(),
                ..Self::default()
            };
            config.save().context("Failed to save default config")?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        std::fs::write(&self.config_path, self.to_toml()?).context("Failed to write config file")?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Directory recordings are written to
    pub fn recordings_dir(&self) -> Result<PathBuf> {
        match &self.recordings_dir {
            Some(dir) => Ok(dir.clone()),
            None => pitchy_paths::get_recordings_dir(),
        }
    }
}
