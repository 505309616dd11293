//! Configuration management for Tootcast

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use secrecy::SecretString;

use crate::error::{ConfigError, Result, TootcastError};
use crate::types::Visibility;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub instance: InstanceConfig,
    #[serde(default)]
    pub compose: ComposeConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Base URL, e.g. "https://akkoma.example"
    pub url: String,
    #[serde(default)]
    pub flavour: Flavour,
    pub token_file: String,
}

/// Server software behind the instance
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Flavour {
    Mastodon,
    /// Pleroma and its fork Akkoma
    #[default]
    #[serde(alias = "akkoma")]
    Pleroma,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeConfig {
    /// Visibility used when no sticky preference has been stored yet
    #[serde(default)]
    pub default_visibility: Visibility,
    #[serde(default = "default_max_attachments")]
    pub max_attachments: usize,
    #[serde(default)]
    pub max_characters: Option<usize>,
    #[serde(default = "default_navigation_delay_ms")]
    pub navigation_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upper bound on concurrent attachment uploads
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: String,
}

fn default_max_attachments() -> usize {
    4
}

fn default_navigation_delay_ms() -> u64 {
    1000
}

fn default_max_in_flight() -> usize {
    4
}

fn default_storage_path() -> String {
    "~/.local/share/tootcast/store.json".to_string()
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            default_visibility: Visibility::default(),
            max_attachments: default_max_attachments(),
            max_characters: None,
            navigation_delay_ms: default_navigation_delay_ms(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            instance: InstanceConfig {
                url: "https://akkoma.example".to_string(),
                flavour: Flavour::Pleroma,
                token_file: "~/.config/tootcast/token".to_string(),
            },
            compose: ComposeConfig::default(),
            upload: UploadConfig::default(),
            storage: StorageConfig::default(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.instance.url.trim().is_empty() {
            return Err(ConfigError::MissingField("instance.url".to_string()).into());
        }
        if self.upload.max_in_flight == 0 {
            return Err(ConfigError::InvalidValue {
                field: "upload.max_in_flight".to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Instance URL with an `https://` scheme prepended when none was given
    pub fn instance_url(&self) -> String {
        normalize_instance_url(&self.instance.url)
    }

    /// Host part of the instance URL
    pub fn instance_host(&self) -> Result<String> {
        let url = url::Url::parse(&self.instance_url()).map_err(|e| ConfigError::InvalidValue {
            field: "instance.url".to_string(),
            reason: e.to_string(),
        })?;
        url.host_str()
            .map(str::to_string)
            .ok_or_else(|| ConfigError::MissingField("instance.url host".to_string()).into())
    }

    /// Landing page of the instance web UI
    pub fn instance_home_url(&self) -> String {
        match self.instance.flavour {
            Flavour::Pleroma => format!("{}/main/friends/", self.instance_url()),
            Flavour::Mastodon => format!("{}/home", self.instance_url()),
        }
    }

    /// Read and trim the access token from the configured token file
    pub fn read_token(&self) -> Result<SecretString> {
        let token_path = shellexpand::full(&self.instance.token_file).map_err(|e| {
            TootcastError::Auth(format!("Failed to expand token file path: {}", e))
        })?;

        let token = std::fs::read_to_string(token_path.as_ref())
            .map_err(|e| TootcastError::Auth(format!("Failed to read token file: {}", e)))?
            .trim()
            .to_string();

        if token.is_empty() {
            return Err(TootcastError::Auth("Token file is empty".to_string()));
        }

        Ok(SecretString::from(token))
    }

    /// Expanded path of the durable key-value store
    pub fn storage_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.storage.path).to_string())
    }
}

fn normalize_instance_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("TOOTCAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("tootcast").join("config.toml"))
}
