//! Server state

use std::sync::Arc;

use crate::deploy::{DeployOrchestrator, JobDeployOrchestrator};
use crate::events::DeployHistory;
use crate::registry::UserDirectory;

/// Server state shared across handlers
pub struct ServerState {
    pub deploys: Arc<DeployOrchestrator>,
    pub job_deploys: Arc<JobDeployOrchestrator>,
    pub history: DeployHistory,
    pub users: Arc<dyn UserDirectory>,
}

impl ServerState {
    pub fn new(
        deploys: Arc<DeployOrchestrator>,
        job_deploys: Arc<JobDeployOrchestrator>,
        history: DeployHistory,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            deploys,
            job_deploys,
            history,
            users,
        }
    }
}
