//! Application configuration management.
//!
//! This module handles loading and saving the configuration that tells the
//! CLI which identity ref to use, which secret store backend holds it, and how
//! to reach the CRM API.
//!
//! Configuration is stored at `~/.config/crmsession/config.json`. The
//! `CRMSESSION_IDENTITY_REF` environment variable overrides `identity_ref`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::rest::{DEFAULT_API_VERSION, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::api::RestClientConfig;
use crate::store::{FileSecretStore, KeyringSecretStore, SecretStore};

/// Application name used for config directory paths
const APP_NAME: &str = "crmsession";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the configured identity ref
pub const IDENTITY_REF_ENV: &str = "CRMSESSION_IDENTITY_REF";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub identity_ref: Option<String>,
    pub store: StoreBackend,
    /// Directory for the file backend; the platform cache dir when unset.
    pub secrets_dir: Option<PathBuf>,
    /// Service name for the keyring backend.
    pub keyring_service: Option<String>,
    pub login_url: Option<String>,
    pub api_version: String,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            identity_ref: None,
            store: StoreBackend::default(),
            secrets_dir: None,
            keyring_service: None,
            login_url: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Identity ref from the environment, else from the file.
    pub fn resolve_identity_ref(&self) -> Option<String> {
        self.identity_ref_with_override(std::env::var(IDENTITY_REF_ENV).ok())
    }

    fn identity_ref_with_override(&self, env_value: Option<String>) -> Option<String> {
        env_value
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.identity_ref.clone())
    }

    pub fn rest_client_config(&self) -> RestClientConfig {
        RestClientConfig {
            login_url: self.login_url.clone(),
            api_version: self.api_version.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn open_secret_store(&self) -> Result<Arc<dyn SecretStore>> {
        match self.store {
            StoreBackend::File => {
                let dir = match self.secrets_dir {
                    Some(ref dir) => dir.clone(),
                    None => FileSecretStore::default_dir()
                        .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?,
                };
                Ok(Arc::new(FileSecretStore::new(dir)))
            }
            StoreBackend::Keyring => Ok(Arc::new(match self.keyring_service {
                Some(ref service) => KeyringSecretStore::new(service.clone()),
                None => KeyringSecretStore::default(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.api_version, "59.0");
        assert_eq!(config.store, StoreBackend::File);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            identity_ref: Some("arn:secret:crm".to_string()),
            store: StoreBackend::Keyring,
            keyring_service: Some("crm-prod".to_string()),
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"store":"keyring","request_timeout_secs":5}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.store, StoreBackend::Keyring);
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.api_version, "59.0");
        assert_eq!(config.rest_client_config().request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_env_override_wins_when_non_empty() {
        let config = Config {
            identity_ref: Some("from-file".to_string()),
            ..Config::default()
        };
        assert_eq!(
            config.identity_ref_with_override(Some("from-env".to_string())).as_deref(),
            Some("from-env")
        );
        assert_eq!(
            config.identity_ref_with_override(Some("  ".to_string())).as_deref(),
            Some("from-file")
        );
        assert_eq!(config.identity_ref_with_override(None).as_deref(), Some("from-file"));
    }

    #[test]
    fn test_open_file_store_in_configured_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            secrets_dir: Some(dir.path().to_path_buf()),
            ..Config::default()
        };
        let store = config.open_secret_store().unwrap();
        store.put_secret_value("ref", "{}").unwrap();
        assert_eq!(store.get_secret_value("ref").unwrap().secret_string, "{}");
    }
}
