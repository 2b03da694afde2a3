//! Version manager
//!
//! Owns each app's ordered version history: allocation, the commit protocol,
//! reference resolution and the rollback availability toggle.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{BuildError, DeployError};
use crate::models::version::{AppVersion, VersionStatus};
use crate::versions::fsm::{VersionEvent, VersionFsm};
use crate::versions::store::VersionStore;

/// Version manager settings
#[derive(Debug, Clone)]
pub struct VersionSettings {
    /// Registry namespace version images are pushed under
    pub image_namespace: String,

    /// Maximum length of a disable reason, zero for no limit
    pub max_disable_reason_len: usize,
}

impl Default for VersionSettings {
    fn default() -> Self {
        Self {
            image_namespace: "deployd".to_string(),
            max_disable_reason_len: 0,
        }
    }
}

/// Version manager
#[derive(Clone)]
pub struct VersionManager {
    store: Arc<dyn VersionStore>,
    settings: VersionSettings,
}

impl VersionManager {
    pub fn new(store: Arc<dyn VersionStore>, settings: VersionSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &VersionSettings {
        &self.settings
    }

    /// Final image name of a version, e.g. `deployd/app-web:v3`
    pub fn base_image_name(&self, app: &str, version: u32) -> String {
        format!("{}/app-{}:v{}", self.settings.image_namespace, app, version)
    }

    /// Intermediate image name of a version
    pub fn build_image_name(&self, app: &str, version: u32) -> String {
        format!("{}-builder", self.base_image_name(app, version))
    }

    /// Allocate the next ordinal for `app` in pending state
    pub async fn new_version(
        &self,
        app: &str,
        event_id: Option<Uuid>,
    ) -> Result<AppVersion, DeployError> {
        let mut version = self.store.create_next(app).await?;
        if event_id.is_some() {
            version.event_id = event_id;
            self.store.update(&version).await?;
        }
        info!("Allocated version {} for app {}", version.tag(), app);
        Ok(version)
    }

    pub async fn commit_build_image(
        &self,
        version: &mut AppVersion,
        image: impl Into<String>,
    ) -> Result<(), DeployError> {
        let mut updated = version.clone();
        apply(&mut updated, VersionEvent::CommitBuildImage)?;
        updated.build_image = Some(image.into());
        self.save(version, updated).await
    }

    pub async fn commit_base_image(
        &self,
        version: &mut AppVersion,
        image: impl Into<String>,
    ) -> Result<(), DeployError> {
        let mut updated = version.clone();
        apply(&mut updated, VersionEvent::CommitBaseImage)?;
        updated.base_image = Some(image.into());
        self.save(version, updated).await
    }

    pub async fn commit_successful(&self, version: &mut AppVersion) -> Result<(), DeployError> {
        let mut updated = version.clone();
        apply(&mut updated, VersionEvent::CommitSuccessful)?;
        self.save(version, updated).await?;
        info!("Version {} of app {} is successful", version.tag(), version.app);
        Ok(())
    }

    /// Abandon an unfinished version, re-reading it first since a builder may
    /// have committed images through its own copy.
    pub async fn abandon(&self, version: &mut AppVersion) -> Result<(), DeployError> {
        if let Some(stored) = self.store.get(&version.app, version.version).await? {
            *version = stored;
        }
        if version.status == VersionStatus::Abandoned {
            return Ok(());
        }
        let mut updated = version.clone();
        apply(&mut updated, VersionEvent::Abandon)?;
        self.save(version, updated).await?;
        warn!("Version {} of app {} abandoned", version.tag(), version.app);
        Ok(())
    }

    /// Finish the commit protocol for a version handed back by a builder
    pub async fn complete(&self, mut version: AppVersion) -> Result<AppVersion, DeployError> {
        match version.status {
            VersionStatus::Successful => Ok(version),
            VersionStatus::BaseImageCommitted => {
                self.commit_successful(&mut version).await?;
                Ok(version)
            }
            _ => Err(BuildError::Uncommitted {
                version: version.version,
            }
            .into()),
        }
    }

    pub async fn versions(&self, app: &str) -> Result<Vec<AppVersion>, DeployError> {
        self.store.list(app).await
    }

    pub async fn resolve_for_app(
        &self,
        app: &str,
        reference: &str,
    ) -> Result<AppVersion, DeployError> {
        let versions = self.store.list(app).await?;
        resolve(&versions, reference)
    }

    /// Toggle whether a successful version may be targeted by rollbacks
    pub async fn set_disabled(
        &self,
        app: &str,
        reference: &str,
        disabled: bool,
        reason: &str,
    ) -> Result<AppVersion, DeployError> {
        let reason = reason.trim();
        if disabled && reason.is_empty() {
            return Err(DeployError::Validation(
                "Reason cannot be empty while disabling a image rollback".to_string(),
            ));
        }
        let max_len = self.settings.max_disable_reason_len;
        if disabled && max_len > 0 && reason.chars().count() > max_len {
            return Err(DeployError::Validation(format!(
                "Reason cannot be longer than {} characters",
                max_len
            )));
        }

        let mut version = self.resolve_for_app(app, reference).await?;
        let reason = if disabled { reason.to_string() } else { String::new() };
        if version.disabled == disabled && version.disabled_reason == reason {
            debug!("Version {} of app {} already in requested state", version.tag(), app);
            return Ok(version);
        }

        version.disabled = disabled;
        version.disabled_reason = reason;
        version.updated_at = Utc::now();
        self.store.update(&version).await?;

        info!(
            "Version {} of app {} {} for rollback",
            version.tag(),
            app,
            if disabled { "disabled" } else { "enabled" }
        );
        Ok(version)
    }

    async fn save(&self, current: &mut AppVersion, mut updated: AppVersion) -> Result<(), DeployError> {
        updated.updated_at = Utc::now();
        self.store.update(&updated).await?;
        debug!(
            "Version {} of app {}: {} -> {}",
            updated.tag(),
            updated.app,
            current.status,
            updated.status
        );
        *current = updated;
        Ok(())
    }
}

fn apply(version: &mut AppVersion, event: VersionEvent) -> Result<(), DeployError> {
    let mut fsm = VersionFsm::from_status(version.status);
    fsm.process(event).map_err(|e| {
        DeployError::InvalidTransition(format!("version {} of app {}: {}", version.tag(), version.app, e))
    })?;
    version.status = fsm.status();
    Ok(())
}

/// Find a rollback candidate by `v<N>` ordinal or by image reference.
///
/// Only successful versions resolve; nothing is ever fabricated. An app with
/// versions that are all pending or abandoned gets `Invalid version`, not the
/// empty-history error.
pub fn resolve(versions: &[AppVersion], reference: &str) -> Result<AppVersion, DeployError> {
    if versions.is_empty() {
        return Err(DeployError::NotFound(
            "no versions available for app".to_string(),
        ));
    }

    let found = match parse_ordinal(reference) {
        Some(ordinal) => versions.iter().find(|v| v.version == ordinal),
        None => versions.iter().find(|v| v.has_image(reference)),
    };

    found
        .filter(|v| v.is_successful())
        .cloned()
        .ok_or_else(|| DeployError::NotFound(format!("Invalid version: {}", reference)))
}

fn parse_ordinal(reference: &str) -> Option<u32> {
    reference
        .strip_prefix('v')
        .and_then(|n| n.parse::<u32>().ok())
        .filter(|n| *n > 0)
}

/// Rollback targets must not be disabled
pub fn ensure_rollback_target(version: &AppVersion) -> Result<(), DeployError> {
    if version.disabled {
        return Err(DeployError::Validation(format!(
            "version {} is disabled for rollback: {}",
            version.tag(),
            version.disabled_reason
        )));
    }
    Ok(())
}
