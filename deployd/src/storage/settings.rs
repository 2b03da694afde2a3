//! Settings file management

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::app::options::{AppOptions, LifecycleOptions, ServerOptions};
use crate::logs::{LogLevel, LogOptions};
use crate::models::app::{App, Job};
use crate::permission::User;
use crate::versions::VersionSettings;

/// Service settings
#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub log_json: bool,

    /// Directory for rolling log files, stdout only when absent
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub versions: VersionFileSettings,

    /// Maximum delay for graceful shutdown in seconds
    #[serde(default = "default_shutdown_delay")]
    pub shutdown_delay_secs: u64,

    /// Registry contents loaded at startup
    #[serde(default)]
    pub seed: SeedSettings,
}

fn default_shutdown_delay() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            server: ServerSettings::default(),
            versions: VersionFileSettings::default(),
            shutdown_delay_secs: default_shutdown_delay(),
            seed: SeedSettings::default(),
        }
    }
}

impl Settings {
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading settings file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing settings file {}", path.display()))
    }

    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            log_level: self.log_level.clone(),
            log_dir: self.log_dir.clone(),
            json_format: self.log_json,
            ..Default::default()
        }
    }

    pub fn app_options(&self) -> AppOptions {
        AppOptions {
            lifecycle: LifecycleOptions {
                max_shutdown_delay: Duration::from_secs(self.shutdown_delay_secs),
            },
            server: ServerOptions {
                host: self.server.host.clone(),
                port: self.server.port,
                max_upload_bytes: self.server.max_upload_mb * 1024 * 1024,
            },
            versions: VersionSettings {
                image_namespace: self.versions.image_namespace.clone(),
                max_disable_reason_len: self.versions.max_disable_reason_len,
            },
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted deploy body in MiB
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_upload_mb() -> usize {
    64
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionFileSettings {
    #[serde(default = "default_image_namespace")]
    pub image_namespace: String,

    /// Zero disables the limit
    #[serde(default)]
    pub max_disable_reason_len: usize,
}

fn default_image_namespace() -> String {
    VersionSettings::default().image_namespace
}

impl Default for VersionFileSettings {
    fn default() -> Self {
        Self {
            image_namespace: default_image_namespace(),
            max_disable_reason_len: 0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SeedSettings {
    #[serde(default)]
    pub apps: Vec<App>,

    #[serde(default)]
    pub jobs: Vec<Job>,

    #[serde(default)]
    pub users: Vec<UserSeed>,
}

/// A user and the API token it authenticates with
#[derive(Debug, Deserialize)]
pub struct UserSeed {
    #[serde(deserialize_with = "deserialize_secret")]
    pub token: SecretString,

    #[serde(flatten)]
    pub user: User,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}
