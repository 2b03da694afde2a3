//! In-memory registries

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::errors::DeployError;
use crate::models::app::{App, Job};
use crate::permission::User;
use crate::registry::{AppRegistry, JobRegistry, UserDirectory};
use crate::utils::sha256_hash;

#[derive(Default)]
pub struct MemoryAppRegistry {
    apps: RwLock<HashMap<String, App>>,
}

impl MemoryAppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, app: App) {
        let mut apps = self.apps.write().unwrap_or_else(|e| e.into_inner());
        apps.insert(app.name.clone(), app);
    }
}

#[async_trait]
impl AppRegistry for MemoryAppRegistry {
    async fn get(&self, name: &str) -> Result<Option<App>, DeployError> {
        let apps = self.apps.read().unwrap_or_else(|e| e.into_inner());
        Ok(apps.get(name).cloned())
    }

    async fn increment_deploys(&self, name: &str) -> Result<u64, DeployError> {
        let mut apps = self.apps.write().unwrap_or_else(|e| e.into_inner());
        let app = apps
            .get_mut(name)
            .ok_or_else(|| DeployError::NotFound("App not found".to_string()))?;
        app.deploys += 1;
        Ok(app.deploys)
    }
}

#[derive(Default)]
pub struct MemoryJobRegistry {
    jobs: RwLock<HashMap<String, Job>>,
}

impl MemoryJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: Job) {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        jobs.insert(job.name.clone(), job);
    }
}

#[async_trait]
impl JobRegistry for MemoryJobRegistry {
    async fn get(&self, name: &str) -> Result<Option<Job>, DeployError> {
        let jobs = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        Ok(jobs.get(name).cloned())
    }
}

/// Token directory keyed by token digest; plain tokens are never stored
#[derive(Default)]
pub struct TokenDirectory {
    users: RwLock<HashMap<String, User>>,
}

impl TokenDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, token: &SecretString, user: User) {
        let digest = sha256_hash(token.expose_secret().as_bytes());
        let mut users = self.users.write().unwrap_or_else(|e| e.into_inner());
        users.insert(digest, user);
    }

    pub fn len(&self) -> usize {
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserDirectory for TokenDirectory {
    async fn authenticate(&self, token: &SecretString) -> Result<Option<User>, DeployError> {
        let digest = sha256_hash(token.expose_secret().as_bytes());
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        Ok(users.get(&digest).cloned())
    }
}
