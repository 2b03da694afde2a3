//! Deploy history
//!
//! Read-only projection of finished and running app deploy events.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use openapi_server::models::DeployDataResponse;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::DeployError;
use crate::events::store::{Event, EventFilter, EventStore, EventTarget};
use crate::permission::{Authorizer, PermissionScheme, User};

/// One deploy as shown to users
#[derive(Debug, Clone, PartialEq)]
pub struct DeployData {
    pub id: Uuid,
    pub app: String,
    pub timestamp: DateTime<Utc>,
    pub duration: chrono::Duration,
    pub commit: String,
    pub error: String,
    pub image: String,
    pub log: String,
    pub user: String,
    pub origin: String,
    pub can_rollback: bool,
    pub diff: String,
    pub message: String,
    pub version: u32,
}

impl DeployData {
    pub fn from_event(event: &Event) -> Self {
        let start = &event.start_custom_data;
        let end = &event.end_custom_data;

        let image = str_field(end, "image");
        let version = end
            .get("version")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .or_else(|| version_from_image(&image))
            .unwrap_or(0);
        let user = match str_field(start, "user") {
            user if user.is_empty() => event.owner.clone(),
            user => user,
        };
        let app = match str_field(start, "app.name") {
            app if app.is_empty() => event.target.value.clone(),
            app => app,
        };

        Self {
            id: event.id,
            app,
            timestamp: event.start_time,
            duration: event.duration(),
            commit: str_field(start, "commit"),
            error: event.error.clone(),
            can_rollback: !event.running && event.error.is_empty() && !image.is_empty(),
            image,
            log: event.log.clone(),
            user,
            origin: str_field(start, "origin"),
            diff: str_field(&event.other_custom_data, "diff"),
            message: str_field(start, "message"),
            version,
        }
    }
}

impl From<DeployData> for DeployDataResponse {
    fn from(data: DeployData) -> Self {
        DeployDataResponse {
            id: data.id,
            app: data.app,
            timestamp: data.timestamp,
            duration_ms: data.duration.num_milliseconds(),
            commit: data.commit,
            error: data.error,
            image: data.image,
            log: data.log,
            user: data.user,
            origin: data.origin,
            can_rollback: data.can_rollback,
            diff: data.diff,
            message: data.message,
            version: data.version,
        }
    }
}

fn str_field(data: &Value, key: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Ordinal carried by a version image tag, `name:v3` -> 3
fn version_from_image(image: &str) -> Option<u32> {
    image
        .rsplit_once(':')
        .and_then(|(_, tag)| tag.strip_prefix('v'))
        .and_then(|n| n.parse().ok())
}

/// Deploy history queries
#[derive(Clone)]
pub struct DeployHistory {
    events: Arc<dyn EventStore>,
    authorizer: Arc<dyn Authorizer>,
}

impl DeployHistory {
    pub fn new(events: Arc<dyn EventStore>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self { events, authorizer }
    }

    /// Deploys visible to `viewer`, newest first
    pub async fn list(
        &self,
        viewer: &User,
        app: Option<&str>,
    ) -> Result<Vec<DeployData>, DeployError> {
        let filter = EventFilter {
            kind: Some(PermissionScheme::AppDeploy),
            target: app.map(EventTarget::app),
        };
        let mut events = self.events.list(&filter).await?;
        events.sort_by(|a, b| b.start_time.cmp(&a.start_time));

        let mut deploys = Vec::with_capacity(events.len());
        for event in &events {
            if self.can_read(viewer, event).await? {
                deploys.push(DeployData::from_event(event));
            }
        }
        Ok(deploys)
    }

    /// Deploys the viewer may not read are reported as missing.
    pub async fn get(&self, viewer: &User, id: Uuid) -> Result<DeployData, DeployError> {
        let not_found = || DeployError::NotFound("Deploy not found.".to_string());

        let event = self.events.get(id).await?.ok_or_else(not_found)?;
        if event.kind != PermissionScheme::AppDeploy || !self.can_read(viewer, &event).await? {
            return Err(not_found());
        }
        Ok(DeployData::from_event(&event))
    }

    async fn can_read(&self, viewer: &User, event: &Event) -> Result<bool, DeployError> {
        self.authorizer
            .is_allowed(viewer, PermissionScheme::AppReadDeploy, &event.allowed.contexts)
            .await
    }
}
