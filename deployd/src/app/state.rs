//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::builder::{BuilderDispatch, ImageBuilder, ImageJobBuilder, PointerReleaser};
use crate::deploy::{DeployOrchestrator, JobDeployOrchestrator};
use crate::events::{DeployHistory, EventStore, MemoryEventStore};
use crate::models::deploy::DeployKind;
use crate::permission::{Authorizer, GrantAuthorizer};
use crate::registry::{MemoryAppRegistry, MemoryJobRegistry, TokenDirectory};
use crate::server::state::ServerState;
use crate::storage::settings::SeedSettings;
use crate::versions::{MemoryVersionStore, VersionManager};

/// Main application state
pub struct AppState {
    pub apps: Arc<MemoryAppRegistry>,
    pub jobs: Arc<MemoryJobRegistry>,
    pub users: Arc<TokenDirectory>,
    pub events: Arc<MemoryEventStore>,
    pub versions: VersionManager,
    pub deploys: Arc<DeployOrchestrator>,
    pub job_deploys: Arc<JobDeployOrchestrator>,
    pub history: DeployHistory,
}

impl AppState {
    /// Wire the engine with in-memory collaborators and the image-only
    /// backends. Other deploy kinds fail until a builder is registered.
    pub fn init(options: &AppOptions, seed: SeedSettings) -> Self {
        info!("Initializing application state...");

        let apps = Arc::new(MemoryAppRegistry::new());
        for app in seed.apps {
            apps.insert(app);
        }
        let jobs = Arc::new(MemoryJobRegistry::new());
        for job in seed.jobs {
            jobs.insert(job);
        }
        let users = Arc::new(TokenDirectory::new());
        for seed in seed.users {
            users.insert(&seed.token, seed.user);
        }

        let authorizer: Arc<dyn Authorizer> = Arc::new(GrantAuthorizer);
        let events = Arc::new(MemoryEventStore::new());
        let event_store: Arc<dyn EventStore> = events.clone();
        let versions = VersionManager::new(
            Arc::new(MemoryVersionStore::new()),
            options.versions.clone(),
        );

        let builders = BuilderDispatch::new().with(DeployKind::Image, Arc::new(ImageBuilder));
        let deploys = Arc::new(DeployOrchestrator::new(
            apps.clone(),
            authorizer.clone(),
            event_store.clone(),
            versions.clone(),
            builders,
            Arc::new(PointerReleaser),
        ));
        let job_deploys = Arc::new(JobDeployOrchestrator::new(
            jobs.clone(),
            authorizer.clone(),
            event_store.clone(),
            Arc::new(ImageJobBuilder),
        ));
        let history = DeployHistory::new(event_store, authorizer);

        info!("Loaded {} users", users.len());
        Self {
            apps,
            jobs,
            users,
            events,
            versions,
            deploys,
            job_deploys,
            history,
        }
    }

    pub fn server_state(&self) -> ServerState {
        ServerState::new(
            self.deploys.clone(),
            self.job_deploys.clone(),
            self.history.clone(),
            self.users.clone(),
        )
    }
}
