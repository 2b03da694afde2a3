//! Deploy orchestrator
//!
//! An attempt runs in two phases. [`DeployOrchestrator::prepare`] does every
//! check that can reject a request outright and ends by opening the audit
//! event. [`DeployOrchestrator::run`] then owns that event until it is closed:
//! build or release, commit or abandon the version, stream the outcome.

use std::future::Future;
use std::sync::Arc;

use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::builder::{BuildContext, BuildOpts, BuilderDispatch, Releaser};
use crate::deploy::attempt::AttemptGuard;
use crate::deploy::request::{check_platform, ResolvedDeploy, RollbackUpdate};
use crate::errors::{BuildError, DeployError};
use crate::events::{
    AllowedPermission, EventLog, EventOpts, EventStore, EventTarget, OutputSender, StreamFormat,
};
use crate::models::app::App;
use crate::models::deploy::DeployKind;
use crate::models::version::AppVersion;
use crate::permission::{scheme_for_deploy, Authorizer, PermissionScheme, User};
use crate::registry::AppRegistry;
use crate::versions::{ensure_rollback_target, VersionManager};

const FORBIDDEN_APP: &str = "User does not have permission to do this action in this app";

/// Scheme a caller must hold for a resolved deploy
pub fn required_scheme(resolved: &ResolvedDeploy) -> PermissionScheme {
    match resolved.kind {
        DeployKind::Rollback => PermissionScheme::AppDeployRollback,
        DeployKind::Rebuild => PermissionScheme::AppDeployRebuild,
        _ => scheme_for_deploy(&resolved.options),
    }
}

/// Rollbacks and rebuilds stream JSON lines, everything else raw text
pub fn stream_format(kind: DeployKind) -> StreamFormat {
    match kind {
        DeployKind::Rollback | DeployKind::Rebuild => StreamFormat::JsonLines,
        _ => StreamFormat::Text,
    }
}

/// An authorized deploy bound to its open event
#[derive(Debug)]
pub struct PreparedDeploy {
    app: App,
    resolved: ResolvedDeploy,
    event_id: Uuid,
    rollback_target: Option<AppVersion>,
}

impl PreparedDeploy {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn kind(&self) -> DeployKind {
        self.resolved.kind
    }

    pub fn stream_format(&self) -> StreamFormat {
        stream_format(self.resolved.kind)
    }
}

/// Terminal result of a deploy attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOutcome {
    pub event_id: Uuid,
    pub kind: DeployKind,
    pub version: Option<u32>,
    pub image: Option<String>,
    pub error: Option<String>,
}

impl DeployOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Deploy orchestrator
pub struct DeployOrchestrator {
    apps: Arc<dyn AppRegistry>,
    authorizer: Arc<dyn Authorizer>,
    events: Arc<dyn EventStore>,
    versions: VersionManager,
    builders: BuilderDispatch,
    releaser: Arc<dyn Releaser>,
}

impl DeployOrchestrator {
    pub fn new(
        apps: Arc<dyn AppRegistry>,
        authorizer: Arc<dyn Authorizer>,
        events: Arc<dyn EventStore>,
        versions: VersionManager,
        builders: BuilderDispatch,
        releaser: Arc<dyn Releaser>,
    ) -> Self {
        Self {
            apps,
            authorizer,
            events,
            versions,
            builders,
            releaser,
        }
    }

    pub fn versions(&self) -> &VersionManager {
        &self.versions
    }

    async fn find_app(&self, name: &str) -> Result<App, DeployError> {
        self.apps
            .get(name)
            .await?
            .ok_or_else(|| DeployError::NotFound("App not found".to_string()))
    }

    async fn authorize(&self, user: &User, scheme: PermissionScheme, app: &App) -> Result<(), DeployError> {
        if self
            .authorizer
            .is_allowed(user, scheme, &app.permission_contexts())
            .await?
        {
            Ok(())
        } else {
            Err(DeployError::Forbidden(FORBIDDEN_APP.to_string()))
        }
    }

    /// Validate, authorize and open the audit event.
    ///
    /// Nothing is allocated when this fails.
    pub async fn prepare(
        &self,
        user: &User,
        mut resolved: ResolvedDeploy,
    ) -> Result<PreparedDeploy, DeployError> {
        let app = self.find_app(&resolved.options.app).await?;
        self.authorize(user, required_scheme(&resolved), &app).await?;
        check_platform(&app, resolved.kind)?;

        let rollback_target = if resolved.kind == DeployKind::Rollback {
            let target = self
                .versions
                .resolve_for_app(&app.name, &resolved.options.image)
                .await?;
            ensure_rollback_target(&target)?;
            Some(target)
        } else {
            None
        };

        // Audit records who was authenticated, not what the form claimed.
        resolved.options.user = user.email.clone();

        let event = self
            .events
            .open(EventOpts {
                target: EventTarget::app(&app.name),
                kind: PermissionScheme::AppDeploy,
                owner: user.email.clone(),
                start_custom_data: resolved.options.start_custom_data(),
                allowed: AllowedPermission::new(
                    PermissionScheme::AppReadDeploy,
                    app.permission_contexts(),
                ),
            })
            .await?;

        info!(
            "Deploy {} of app {} ({}) started by {}",
            event.id, app.name, resolved.kind, user.email
        );

        Ok(PreparedDeploy {
            app,
            resolved,
            event_id: event.id,
            rollback_target,
        })
    }

    /// Drive a prepared attempt to completion.
    ///
    /// Build failures are part of the outcome, not errors. When `cancel`
    /// resolves first the in-flight build is dropped and the attempt is
    /// recorded as failed.
    pub async fn run<C>(
        &self,
        prepared: PreparedDeploy,
        output: Option<OutputSender>,
        cancel: C,
    ) -> DeployOutcome
    where
        C: Future<Output = ()> + Send,
    {
        let PreparedDeploy {
            app,
            resolved,
            event_id,
            rollback_target,
        } = prepared;

        let log = EventLog::new(
            event_id,
            self.events.clone(),
            output,
            stream_format(resolved.kind),
        );
        let mut guard = AttemptGuard::new(event_id, self.events.clone(), Some(self.versions.clone()));

        let result = {
            let work = async {
                match &rollback_target {
                    Some(target) => self.release(&app, target, &log).await,
                    None => self.build(&app, &resolved, &log, &mut guard).await,
                }
            };
            tokio::select! {
                result = work => result,
                _ = cancel => Err(BuildError::Canceled),
            }
        };

        match result {
            Ok(version) => self.succeed(&app, resolved.kind, version, &log, guard).await,
            Err(err) => self.fail(&app, resolved.kind, err, &log, guard).await,
        }
    }

    /// Prepare and run without a cancellation source
    pub async fn deploy(
        &self,
        user: &User,
        resolved: ResolvedDeploy,
        output: Option<OutputSender>,
    ) -> Result<DeployOutcome, DeployError> {
        let prepared = self.prepare(user, resolved).await?;
        Ok(self.run(prepared, output, std::future::pending()).await)
    }

    async fn build(
        &self,
        app: &App,
        resolved: &ResolvedDeploy,
        log: &EventLog,
        guard: &mut AttemptGuard,
    ) -> Result<AppVersion, BuildError> {
        let version = self
            .versions
            .new_version(&app.name, Some(log.event_id()))
            .await?;
        guard.track(&version);

        let opts = BuildOpts::from(&resolved.options);
        let built = self
            .builders
            .build(BuildContext {
                app,
                event_id: log.event_id(),
                kind: resolved.kind,
                version,
                opts: &opts,
                versions: &self.versions,
                log,
            })
            .await?;
        guard.track(&built);

        Ok(self.versions.complete(built).await?)
    }

    async fn release(&self, app: &App, target: &AppVersion, log: &EventLog) -> Result<AppVersion, BuildError> {
        self.releaser.release(app, target, log).await?;
        Ok(target.clone())
    }

    async fn succeed(
        &self,
        app: &App,
        kind: DeployKind,
        version: AppVersion,
        log: &EventLog,
        guard: AttemptGuard,
    ) -> DeployOutcome {
        let event_id = log.event_id();
        let image = version.base_image.clone().unwrap_or_default();

        if let Err(e) = self.apps.increment_deploys(&app.name).await {
            warn!("Failed to count deploy of app {}: {}", app.name, e);
        }
        log.line("OK").await;

        let end = json!({ "image": image, "version": version.version });
        if let Err(e) = guard.succeed(end).await {
            error!("Failed to close event {}: {}", event_id, e);
        }
        info!("Deploy {} of app {} finished: {}", event_id, app.name, version.tag());

        DeployOutcome {
            event_id,
            kind,
            version: Some(version.version),
            image: Some(image),
            error: None,
        }
    }

    async fn fail(
        &self,
        app: &App,
        kind: DeployKind,
        err: BuildError,
        log: &EventLog,
        guard: AttemptGuard,
    ) -> DeployOutcome {
        let event_id = log.event_id();
        let reason = err.to_string();

        log.line(&format!("ERROR: {}", reason)).await;
        if let Err(e) = guard.fail(json!({ "image": "" }), &reason).await {
            error!("Failed to close event {}: {}", event_id, e);
        }
        warn!("Deploy {} of app {} failed: {}", event_id, app.name, reason);

        DeployOutcome {
            event_id,
            kind,
            version: None,
            image: None,
            error: Some(reason),
        }
    }

    /// Enable or disable a version as a rollback target
    pub async fn update_rollback(
        &self,
        user: &User,
        app: &str,
        update: RollbackUpdate,
    ) -> Result<AppVersion, DeployError> {
        let app = self.find_app(app).await?;
        self.authorize(user, PermissionScheme::AppUpdateDeployRollback, &app)
            .await?;
        self.versions
            .set_disabled(&app.name, &update.reference, update.disable, &update.reason)
            .await
    }
}
