//! Image-only backends
//!
//! Deploying a prebuilt image needs no build infrastructure: the image is
//! recorded as the version's build image and retagged as its base image.

use async_trait::async_trait;
use tracing::info;

use crate::builder::{BuildContext, Builder, JobBuilder, Releaser};
use crate::errors::BuildError;
use crate::events::EventLog;
use crate::models::app::{App, Job};
use crate::models::deploy::{DeployKind, JobDeployOptions};
use crate::models::version::AppVersion;

/// Promotes a prebuilt image to a new app version
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageBuilder;

#[async_trait]
impl Builder for ImageBuilder {
    async fn build(&self, ctx: BuildContext<'_>) -> Result<AppVersion, BuildError> {
        let BuildContext {
            app,
            opts,
            versions,
            log,
            mut version,
            ..
        } = ctx;

        if opts.image.is_empty() {
            return Err(BuildError::Failed("you must specify an image".to_string()));
        }

        log.line(&format!("---- Pulling image {} ----", opts.image)).await;
        versions.commit_build_image(&mut version, &opts.image).await?;

        let base = versions.base_image_name(&app.name, version.version);
        log.line(&format!(" ---> Tagging {} as {}", opts.image, base)).await;
        versions.commit_base_image(&mut version, base).await?;

        info!("Image {} promoted to {} for app {}", opts.image, version.tag(), app.name);
        Ok(version)
    }
}

/// Rollback releaser that only records the new pointer
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerReleaser;

#[async_trait]
impl Releaser for PointerReleaser {
    async fn release(&self, app: &App, version: &AppVersion, log: &EventLog) -> Result<(), BuildError> {
        let image = version
            .base_image
            .as_deref()
            .ok_or_else(|| BuildError::Failed(format!("version {} has no image", version.tag())))?;
        log.line(&format!("Rolling back to image {}", image)).await;
        info!("App {} now points to version {}", app.name, version.tag());
        Ok(())
    }
}

/// Job backend accepting prebuilt images only
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageJobBuilder;

#[async_trait]
impl JobBuilder for ImageJobBuilder {
    async fn deploy(&self, job: &Job, opts: &JobDeployOptions, log: &EventLog) -> Result<String, BuildError> {
        match opts.kind() {
            DeployKind::Image => {
                log.line(&format!("---- Deploying image {} to job {} ----", opts.image, job.name))
                    .await;
                Ok(opts.image.clone())
            }
            kind => Err(BuildError::NoBuilder(kind)),
        }
    }
}
