//! Job deploy orchestrator
//!
//! Same event binding as app deploys, without version history: the backend
//! hands back an image name that is recorded on the event.

use std::future::Future;
use std::sync::Arc;

use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::builder::JobBuilder;
use crate::deploy::attempt::AttemptGuard;
use crate::errors::{BuildError, DeployError};
use crate::events::{
    AllowedPermission, EventLog, EventOpts, EventStore, EventTarget, OutputSender, StreamFormat,
};
use crate::models::app::Job;
use crate::models::deploy::JobDeployOptions;
use crate::permission::{Authorizer, PermissionScheme, User};
use crate::registry::JobRegistry;

#[derive(Debug)]
pub struct PreparedJobDeploy {
    job: Job,
    options: JobDeployOptions,
    event_id: Uuid,
}

impl PreparedJobDeploy {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDeployOutcome {
    pub event_id: Uuid,
    pub image: Option<String>,
    pub error: Option<String>,
}

impl JobDeployOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

pub struct JobDeployOrchestrator {
    jobs: Arc<dyn JobRegistry>,
    authorizer: Arc<dyn Authorizer>,
    events: Arc<dyn EventStore>,
    builder: Arc<dyn JobBuilder>,
}

impl JobDeployOrchestrator {
    pub fn new(
        jobs: Arc<dyn JobRegistry>,
        authorizer: Arc<dyn Authorizer>,
        events: Arc<dyn EventStore>,
        builder: Arc<dyn JobBuilder>,
    ) -> Self {
        Self {
            jobs,
            authorizer,
            events,
            builder,
        }
    }

    pub async fn prepare(
        &self,
        user: &User,
        mut options: JobDeployOptions,
    ) -> Result<PreparedJobDeploy, DeployError> {
        let job = self
            .jobs
            .get(&options.job)
            .await?
            .ok_or_else(|| DeployError::NotFound(format!("Job {} not found.", options.job)))?;

        let contexts = job.permission_contexts();
        if !self
            .authorizer
            .is_allowed(user, PermissionScheme::JobDeploy, &contexts)
            .await?
        {
            return Err(DeployError::Forbidden(
                "User does not have permission to do this action in this job".to_string(),
            ));
        }

        options.user = user.email.clone();
        let event = self
            .events
            .open(EventOpts {
                target: EventTarget::job(&job.name),
                kind: PermissionScheme::JobDeploy,
                owner: user.email.clone(),
                start_custom_data: options.start_custom_data(),
                allowed: AllowedPermission::new(PermissionScheme::Job, contexts),
            })
            .await?;

        info!("Deploy {} of job {} started by {}", event.id, job.name, user.email);
        Ok(PreparedJobDeploy {
            job,
            options,
            event_id: event.id,
        })
    }

    pub async fn run<C>(
        &self,
        prepared: PreparedJobDeploy,
        output: Option<OutputSender>,
        cancel: C,
    ) -> JobDeployOutcome
    where
        C: Future<Output = ()> + Send,
    {
        let PreparedJobDeploy {
            job,
            options,
            event_id,
        } = prepared;
        let log = EventLog::new(event_id, self.events.clone(), output, StreamFormat::Text);
        let guard = AttemptGuard::new(event_id, self.events.clone(), None);

        let result = tokio::select! {
            result = self.builder.deploy(&job, &options, &log) => result,
            _ = cancel => Err(BuildError::Canceled),
        };

        match result {
            Ok(image) => {
                log.line("\nDeploy finished with success!").await;
                if let Err(e) = guard.succeed(json!({ "image": image })).await {
                    error!("Failed to close event {}: {}", event_id, e);
                }
                info!("Job {} now runs {}", job.name, image);
                JobDeployOutcome {
                    event_id,
                    image: Some(image),
                    error: None,
                }
            }
            Err(err) => {
                let reason = err.to_string();
                log.line(&format!("Failed to deploy job {}: {}", job.name, reason))
                    .await;
                if let Err(e) = guard.fail(json!({ "image": "" }), &reason).await {
                    error!("Failed to close event {}: {}", event_id, e);
                }
                warn!("Deploy {} of job {} failed: {}", event_id, job.name, reason);
                JobDeployOutcome {
                    event_id,
                    image: None,
                    error: Some(reason),
                }
            }
        }
    }

    pub async fn deploy(
        &self,
        user: &User,
        options: JobDeployOptions,
        output: Option<OutputSender>,
    ) -> Result<JobDeployOutcome, DeployError> {
        let prepared = self.prepare(user, options).await?;
        Ok(self.run(prepared, output, std::future::pending()).await)
    }
}
