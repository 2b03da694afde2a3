//! App version models

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Commit status of an app version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionStatus {
    /// Allocated, build in progress
    Pending,

    /// Intermediate build image recorded
    BuildImageCommitted,

    /// Final image pushed
    BaseImageCommitted,

    /// Usable for traffic and rollback
    Successful,

    /// Build failed or never committed
    Abandoned,
}

impl VersionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, VersionStatus::Successful | VersionStatus::Abandoned)
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VersionStatus::Pending => "pending",
            VersionStatus::BuildImageCommitted => "build-image-committed",
            VersionStatus::BaseImageCommitted => "base-image-committed",
            VersionStatus::Successful => "successful",
            VersionStatus::Abandoned => "abandoned",
        };
        f.write_str(s)
    }
}

/// One ordinally numbered build artifact of an app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppVersion {
    pub app: String,

    /// 1-based ordinal, unique per app
    pub version: u32,

    #[serde(default)]
    pub build_image: Option<String>,

    #[serde(default)]
    pub base_image: Option<String>,

    pub status: VersionStatus,

    #[serde(default)]
    pub disabled: bool,

    #[serde(default)]
    pub disabled_reason: String,

    /// Deploy event that produced this version
    #[serde(default)]
    pub event_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppVersion {
    pub fn new(app: impl Into<String>, version: u32) -> Self {
        let now = Utc::now();
        Self {
            app: app.into(),
            version,
            build_image: None,
            base_image: None,
            status: VersionStatus::Pending,
            disabled: false,
            disabled_reason: String::new(),
            event_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Ordinal reference, e.g. `v3`
    pub fn tag(&self) -> String {
        format!("v{}", self.version)
    }

    pub fn is_successful(&self) -> bool {
        self.status == VersionStatus::Successful
    }

    pub fn can_rollback(&self) -> bool {
        self.is_successful() && !self.disabled
    }

    /// Whether `reference` names this version by image
    pub fn has_image(&self, reference: &str) -> bool {
        self.base_image.as_deref() == Some(reference)
            || self.build_image.as_deref() == Some(reference)
    }
}
