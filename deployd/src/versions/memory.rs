//! In-memory version store

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::errors::DeployError;
use crate::models::version::AppVersion;
use crate::versions::store::VersionStore;

/// In-memory version store
///
/// Ordinal allocation happens under the write lock, which serializes
/// concurrent `create_next` calls.
#[derive(Default)]
pub struct MemoryVersionStore {
    apps: RwLock<HashMap<String, BTreeMap<u32, AppVersion>>>,
}

impl MemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of apps with at least one version
    pub fn len(&self) -> usize {
        let apps = self.apps.read().unwrap_or_else(|e| e.into_inner());
        apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VersionStore for MemoryVersionStore {
    async fn create_next(&self, app: &str) -> Result<AppVersion, DeployError> {
        let mut apps = self.apps.write().unwrap_or_else(|e| e.into_inner());
        let versions = apps.entry(app.to_string()).or_default();

        let next = versions.keys().next_back().copied().unwrap_or(0) + 1;
        let version = AppVersion::new(app, next);
        versions.insert(next, version.clone());

        Ok(version)
    }

    async fn get(&self, app: &str, version: u32) -> Result<Option<AppVersion>, DeployError> {
        let apps = self.apps.read().unwrap_or_else(|e| e.into_inner());
        Ok(apps.get(app).and_then(|versions| versions.get(&version)).cloned())
    }

    async fn list(&self, app: &str) -> Result<Vec<AppVersion>, DeployError> {
        let apps = self.apps.read().unwrap_or_else(|e| e.into_inner());
        Ok(apps
            .get(app)
            .map(|versions| versions.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn update(&self, version: &AppVersion) -> Result<(), DeployError> {
        let mut apps = self.apps.write().unwrap_or_else(|e| e.into_inner());
        let slot = apps
            .get_mut(&version.app)
            .and_then(|versions| versions.get_mut(&version.version))
            .ok_or_else(|| {
                DeployError::Storage(format!(
                    "version {} of app {} was never allocated",
                    version.tag(),
                    version.app
                ))
            })?;
        *slot = version.clone();
        Ok(())
    }

    async fn max_version(&self, app: &str) -> Result<u32, DeployError> {
        let apps = self.apps.read().unwrap_or_else(|e| e.into_inner());
        Ok(apps
            .get(app)
            .and_then(|versions| versions.keys().next_back().copied())
            .unwrap_or(0))
    }
}
