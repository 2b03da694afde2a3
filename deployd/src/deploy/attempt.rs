//! Attempt bookkeeping
//!
//! An open event, and the version allocated under it, must be finalized on
//! every exit path. [`AttemptGuard`] closes both when the attempt future is
//! dropped before reaching a terminal state.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{error, warn};
use uuid::Uuid;

use crate::errors::DeployError;
use crate::events::{Event, EventStore};
use crate::models::version::AppVersion;
use crate::versions::VersionManager;

const INTERRUPTED: &str = "deploy attempt interrupted before completion";

pub struct AttemptGuard {
    event_id: Uuid,
    events: Arc<dyn EventStore>,
    versions: Option<VersionManager>,
    version: Option<AppVersion>,
    finished: bool,
}

impl AttemptGuard {
    pub fn new(event_id: Uuid, events: Arc<dyn EventStore>, versions: Option<VersionManager>) -> Self {
        Self {
            event_id,
            events,
            versions,
            version: None,
            finished: false,
        }
    }

    /// Version to abandon should the attempt fail
    pub fn track(&mut self, version: &AppVersion) {
        self.version = Some(version.clone());
    }

    pub async fn succeed(mut self, end_custom_data: Value) -> Result<Event, DeployError> {
        self.finished = true;
        self.events.close(self.event_id, end_custom_data, None).await
    }

    pub async fn fail(mut self, end_custom_data: Value, reason: &str) -> Result<Event, DeployError> {
        self.finished = true;
        if let (Some(versions), Some(mut version)) = (self.versions.clone(), self.version.take()) {
            if let Err(e) = versions.abandon(&mut version).await {
                warn!("Failed to abandon version {} of app {}: {}", version.tag(), version.app, e);
            }
        }
        self.events
            .close(self.event_id, end_custom_data, Some(reason.to_string()))
            .await
    }
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!("Event {} left running: no runtime to finalize it", self.event_id);
            return;
        };

        let event_id = self.event_id;
        let events = self.events.clone();
        let versions = self.versions.clone();
        let version = self.version.take();

        warn!("Finalizing interrupted deploy attempt {}", event_id);
        runtime.spawn(async move {
            if let (Some(versions), Some(mut version)) = (versions, version) {
                if let Err(e) = versions.abandon(&mut version).await {
                    warn!("Failed to abandon version {}: {}", version.tag(), e);
                }
            }
            if let Err(e) = events
                .close(event_id, json!({ "image": "" }), Some(INTERRUPTED.to_string()))
                .await
            {
                error!("Failed to close event {}: {}", event_id, e);
            }
        });
    }
}
