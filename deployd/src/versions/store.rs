//! Version persistence seam

use async_trait::async_trait;

use crate::errors::DeployError;
use crate::models::version::AppVersion;

/// Backing store for app versions, keyed by (app, ordinal)
#[async_trait]
pub trait VersionStore: Send + Sync {
    /// Allocate the next ordinal for `app` and store it as a pending version.
    ///
    /// Must be atomic per app: concurrent callers never observe the same
    /// current maximum.
    async fn create_next(&self, app: &str) -> Result<AppVersion, DeployError>;

    async fn get(&self, app: &str, version: u32) -> Result<Option<AppVersion>, DeployError>;

    /// All versions of `app`, ordered by ordinal
    async fn list(&self, app: &str) -> Result<Vec<AppVersion>, DeployError>;

    /// Replace an existing version
    async fn update(&self, version: &AppVersion) -> Result<(), DeployError>;

    /// Highest ordinal ever allocated for `app`, zero if none
    async fn max_version(&self, app: &str) -> Result<u32, DeployError>;
}
