//! App and job models

use serde::{Deserialize, Serialize};

use crate::permission::PermissionContext;

/// An application registered on the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    /// Unique app name
    pub name: String,

    /// Platform used to build source deploys, empty when unset
    #[serde(default)]
    pub platform: String,

    /// Owning team
    pub team_owner: String,

    /// Additional teams with access to the app
    #[serde(default)]
    pub teams: Vec<String>,

    #[serde(default)]
    pub pool: String,

    #[serde(default)]
    pub router: String,

    /// Number of successful deploys
    #[serde(default)]
    pub deploys: u64,
}

impl App {
    pub fn new(name: impl Into<String>, team_owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            platform: String::new(),
            team_owner: team_owner.into(),
            teams: Vec::new(),
            pool: String::new(),
            router: String::new(),
            deploys: 0,
        }
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn with_pool(mut self, pool: impl Into<String>) -> Self {
        self.pool = pool.into();
        self
    }

    pub fn has_platform(&self) -> bool {
        !self.platform.trim().is_empty()
    }

    /// Contexts a permission grant may be scoped to for this app
    pub fn permission_contexts(&self) -> Vec<PermissionContext> {
        let mut contexts = vec![
            PermissionContext::App(self.name.clone()),
            PermissionContext::Team(self.team_owner.clone()),
        ];
        for team in &self.teams {
            let ctx = PermissionContext::Team(team.clone());
            if !contexts.contains(&ctx) {
                contexts.push(ctx);
            }
        }
        if !self.pool.is_empty() {
            contexts.push(PermissionContext::Pool(self.pool.clone()));
        }
        contexts
    }
}

/// A scheduled job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    pub team_owner: String,
    #[serde(default)]
    pub pool: String,
    #[serde(default)]
    pub schedule: String,
}

impl Job {
    pub fn new(name: impl Into<String>, team_owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            team_owner: team_owner.into(),
            pool: String::new(),
            schedule: String::new(),
        }
    }

    pub fn permission_contexts(&self) -> Vec<PermissionContext> {
        let mut contexts = vec![
            PermissionContext::Job(self.name.clone()),
            PermissionContext::Team(self.team_owner.clone()),
        ];
        if !self.pool.is_empty() {
            contexts.push(PermissionContext::Pool(self.pool.clone()));
        }
        contexts
    }
}
