//! Infrastructure implementation of the `ConfigStore` port.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::ConfigStore;
use crate::domain::config::{self, AgentConfig, CONFIG_ENV};

/// Production implementation of `ConfigStore` that uses a YAML file on disk.
#[derive(Debug, Clone, Default)]
pub struct YamlConfigStore {
    path: Option<PathBuf>,
}

impl YamlConfigStore {
    /// Use `path` instead of the environment or the default location.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<AgentConfig> {
        let path = self.path()?;
        if !path.exists() {
            return Ok(AgentConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let cfg: AgentConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("cannot parse {}", path.display()))?;
        config::validate(&cfg).with_context(|| format!("invalid config {}", path.display()))?;
        Ok(cfg)
    }

    fn path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        if let Ok(val) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(val));
        }
        Ok(crontopus_home()?.join("config.yaml"))
    }
}

/// `~/.crontopus`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn crontopus_home() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.join(".crontopus"))
}

/// The manifest root: `override_dir`, else the configured path, else
/// `~/.crontopus/job-manifests`.
///
/// # Errors
///
/// Returns an error if the home directory is needed and cannot be determined.
pub fn manifest_dir(cfg: &AgentConfig, override_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = override_dir.or(cfg.manifests.path.as_deref()) {
        return Ok(dir.to_path_buf());
    }
    Ok(crontopus_home()?.join("job-manifests"))
}
