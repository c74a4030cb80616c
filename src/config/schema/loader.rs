use super::Config;
use crate::error::{ConfigError, Result};
use anyhow::Context;
use directories::UserDirs;
use std::fs;
use std::path::{Path, PathBuf};

impl Config {
    /// Load `~/.chatkeep/config.toml`, writing defaults on first run.
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .ok_or_else(|| ConfigError::Load("could not find home directory".into()))?;
        let chatkeep_dir = home.join(".chatkeep");
        if !chatkeep_dir.exists() {
            fs::create_dir_all(&chatkeep_dir).map_err(ConfigError::Io)?;
        }
        Self::load_or_init_at(&chatkeep_dir.join("config.toml"))
    }

    /// Load an explicit config path (`~` is expanded). A missing file is
    /// created with defaults.
    pub fn load_from(path: &str) -> Result<Self> {
        let expanded = PathBuf::from(shellexpand::tilde(path).into_owned());
        Self::load_or_init_at(&expanded)
    }

    fn load_or_init_at(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::from_file(config_path);
        }

        if let Some(parent) = config_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        let mut config = Self {
            config_path: config_path.to_path_buf(),
            ..Self::default()
        };
        config.save()?;
        tracing::info!(path = %config_path.display(), "wrote default config");

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Read, override from the environment, and validate. Used both at
    /// startup and by `ConfigHandle::reload`.
    pub fn from_file(config_path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(config_path).map_err(|e| {
            ConfigError::Load(format!("failed to read {}: {e}", config_path.display()))
        })?;
        let mut config: Config = toml::from_str(&contents).map_err(|e| {
            ConfigError::Load(format!("failed to parse {}: {e}", config_path.display()))
        })?;
        config.config_path = config_path.to_path_buf();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).map_err(ConfigError::Io)?;
        Ok(())
    }
}
