//! Application configuration options

use std::time::Duration;

use crate::versions::VersionSettings;

/// Main application options
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    pub lifecycle: LifecycleOptions,

    pub server: ServerOptions,

    /// Image naming and rollback policy
    pub versions: VersionSettings,
}

#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: String,

    pub port: u16,

    /// Largest accepted request body, uploads included
    pub max_upload_bytes: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_upload_bytes: 64 * 1024 * 1024,
        }
    }
}
