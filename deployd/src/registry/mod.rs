//! Lookups of apps, jobs and callers
//!
//! These are owned by other parts of the platform; the engine reads them and
//! bumps an app's deploy counter.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::errors::DeployError;
use crate::models::app::{App, Job};
use crate::permission::User;

pub mod memory;

pub use memory::{MemoryAppRegistry, MemoryJobRegistry, TokenDirectory};

#[async_trait]
pub trait AppRegistry: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<App>, DeployError>;

    /// Count a successful deploy, returning the new total
    async fn increment_deploys(&self, name: &str) -> Result<u64, DeployError>;
}

#[async_trait]
pub trait JobRegistry: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<Job>, DeployError>;
}

/// Maps API tokens to users
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn authenticate(&self, token: &SecretString) -> Result<Option<User>, DeployError>;
}
