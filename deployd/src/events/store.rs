//! Event store seam

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::DeployError;
use crate::permission::{PermissionContext, PermissionScheme};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    App,
    Job,
}

/// What an event is about; at most one running event per target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventTarget {
    pub target_type: TargetType,
    pub value: String,
}

impl EventTarget {
    pub fn app(name: impl Into<String>) -> Self {
        Self {
            target_type: TargetType::App,
            value: name.into(),
        }
    }

    pub fn job(name: impl Into<String>) -> Self {
        Self {
            target_type: TargetType::Job,
            value: name.into(),
        }
    }
}

impl fmt::Display for EventTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.target_type {
            TargetType::App => "app",
            TargetType::Job => "job",
        };
        write!(f, "{}({})", kind, self.value)
    }
}

/// Permission required to read an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedPermission {
    pub scheme: PermissionScheme,
    pub contexts: Vec<PermissionContext>,
}

impl AllowedPermission {
    pub fn new(scheme: PermissionScheme, contexts: Vec<PermissionContext>) -> Self {
        Self { scheme, contexts }
    }
}

/// Options for opening an event
#[derive(Debug, Clone)]
pub struct EventOpts {
    pub target: EventTarget,
    pub kind: PermissionScheme,
    pub owner: String,
    pub start_custom_data: Value,
    pub allowed: AllowedPermission,
}

/// Audit record of one attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub target: EventTarget,
    pub kind: PermissionScheme,
    pub owner: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub running: bool,
    pub start_custom_data: Value,
    pub end_custom_data: Value,
    pub other_custom_data: Value,
    pub log: String,
    pub error: String,
    pub allowed: AllowedPermission,
}

impl Event {
    pub fn new(opts: EventOpts) -> Self {
        Self {
            id: Uuid::new_v4(),
            target: opts.target,
            kind: opts.kind,
            owner: opts.owner,
            start_time: Utc::now(),
            end_time: None,
            running: true,
            start_custom_data: opts.start_custom_data,
            end_custom_data: Value::Null,
            other_custom_data: Value::Null,
            log: String::new(),
            error: String::new(),
            allowed: opts.allowed,
        }
    }

    /// Zero while the event is running
    pub fn duration(&self) -> chrono::Duration {
        self.end_time
            .map(|end| end - self.start_time)
            .unwrap_or_else(chrono::Duration::zero)
    }
}

/// Event query
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub kind: Option<PermissionScheme>,
    pub target: Option<EventTarget>,
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        self.kind.map(|k| k == event.kind).unwrap_or(true)
            && self.target.as_ref().map(|t| *t == event.target).unwrap_or(true)
    }
}

/// Audit subsystem contract: open, append, close
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Open a running event. Fails with [`DeployError::Conflict`] while
    /// another event on the same target is running.
    async fn open(&self, opts: EventOpts) -> Result<Event, DeployError>;

    async fn append_log(&self, id: Uuid, text: &str) -> Result<(), DeployError>;

    /// Finalize a running event
    async fn close(
        &self,
        id: Uuid,
        end_custom_data: Value,
        error: Option<String>,
    ) -> Result<Event, DeployError>;

    async fn get(&self, id: Uuid) -> Result<Option<Event>, DeployError>;

    async fn list(&self, filter: &EventFilter) -> Result<Vec<Event>, DeployError>;
}
