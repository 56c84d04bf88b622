use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

fn default_listen() -> String {
    "127.0.0.1:8225".to_string()
}

fn default_base_currency() -> String {
    "USD".to_string()
}

fn default_round_digits() -> u32 {
    5
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub app_id: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: "https://openexchangerates.org".to_string(),
            app_id: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct StoreConfig {
    /// Directory holding the SQLite file and the cache keyspace.
    /// Defaults to the platform data dir.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// In-memory stores only; nothing touches disk.
    #[serde(default)]
    pub ephemeral: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    #[serde(default = "default_round_digits")]
    pub round_digits: u32,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = Self::project_dirs()?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path() -> Result<PathBuf> {
        let proj_dirs = Self::project_dirs()?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "fxrates", "fxrates")
            .context("Could not determine project directories")
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Directory for persistent stores, honoring the config override.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.store.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::default_data_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
listen: "0.0.0.0:9000"
base_currency: "USD"
round_digits: 5
provider:
  base_url: "http://example.com/oxr"
  app_id: "secret"
  timeout_secs: 3
store:
  data_dir: "/var/lib/fxrates"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.listen, "0.0.0.0:9000");
        assert_eq!(config.base_currency, "USD");
        assert_eq!(config.round_digits, 5);
        assert_eq!(config.provider.base_url, "http://example.com/oxr");
        assert_eq!(config.provider.app_id, "secret");
        assert_eq!(config.provider.timeout_secs, 3);
        assert_eq!(
            config.store.data_dir,
            Some(PathBuf::from("/var/lib/fxrates"))
        );
        assert!(!config.store.ephemeral);
    }

    #[test]
    fn test_config_defaults() {
        let yaml_str = r#"
provider:
  base_url: "http://example.com/oxr"
  app_id: "secret"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.listen, "127.0.0.1:8225");
        assert_eq!(config.base_currency, "USD");
        assert_eq!(config.round_digits, 5);
        assert_eq!(config.provider.timeout_secs, 10);
        assert_eq!(config.store.data_dir, None);
        assert!(!config.store.ephemeral);
    }
}
