//! Deploy API models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Version response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// App deploy form (url-encoded or the text parts of a multipart body)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployForm {
    #[serde(rename = "archive-url", default)]
    pub archive_url: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub dockerfile: Option<String>,
    #[serde(default)]
    pub commit: Option<String>,
    #[serde(default)]
    pub build: Option<String>,
    #[serde(default)]
    pub rollback: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Query string accepted by the deploy endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployQuery {
    #[serde(default)]
    pub origin: Option<String>,
}

/// Rollback form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollbackForm {
    /// Either `v<N>` or a full image reference
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Rebuild form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RebuildForm {
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Enables or disables a version as a rollback target
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollbackUpdateForm {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub disable: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Job deploy form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobDeployForm {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub dockerfile: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Deploy history filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployListQuery {
    #[serde(default)]
    pub app: Option<String>,
}

/// One past deploy attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployDataResponse {
    pub id: Uuid,
    pub app: String,
    pub timestamp: DateTime<Utc>,
    /// Duration in milliseconds, zero while running
    pub duration_ms: i64,
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

/// A line of a JSON deploy stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamMessage {
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
}
