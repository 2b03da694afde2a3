//! Build backends
//!
//! The engine decides *what* to build; producing images is delegated to a
//! [`Builder`] registered per deploy kind.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::BuildError;
use crate::events::EventLog;
use crate::models::app::{App, Job};
use crate::models::deploy::{ArchiveFile, DeployKind, DeployOptions, JobDeployOptions};
use crate::models::version::AppVersion;
use crate::versions::VersionManager;

pub mod dispatch;
pub mod image;

pub use dispatch::BuilderDispatch;
pub use image::{ImageBuilder, ImageJobBuilder, PointerReleaser};

/// Inputs a builder needs from a deploy request
#[derive(Debug, Clone, Default)]
pub struct BuildOpts {
    pub archive_url: String,
    pub archive_file: Option<ArchiveFile>,
    pub image: String,
    pub dockerfile: String,
    pub commit: String,
    pub build: bool,
    pub rebuild: bool,
    pub message: String,
}

impl From<&DeployOptions> for BuildOpts {
    fn from(opts: &DeployOptions) -> Self {
        Self {
            archive_url: opts.archive_url.clone(),
            archive_file: opts.file.clone(),
            image: opts.image.clone(),
            dockerfile: opts.dockerfile.clone(),
            commit: opts.commit.clone(),
            build: opts.build,
            rebuild: opts.is_rebuild(),
            message: opts.message.clone(),
        }
    }
}

/// Everything handed to a builder for one attempt
pub struct BuildContext<'a> {
    pub app: &'a App,
    pub event_id: Uuid,
    pub kind: DeployKind,

    /// Freshly allocated version, still pending
    pub version: AppVersion,
    pub opts: &'a BuildOpts,

    /// Used to commit images on `version`
    pub versions: &'a VersionManager,
    pub log: &'a EventLog,
}

/// Produces the images of a new app version
#[async_trait]
pub trait Builder: Send + Sync {
    /// Build and commit images on `ctx.version`, returning it with at least
    /// the base image committed.
    async fn build(&self, ctx: BuildContext<'_>) -> Result<AppVersion, BuildError>;
}

/// Points an app at an existing successful version
#[async_trait]
pub trait Releaser: Send + Sync {
    async fn release(&self, app: &App, version: &AppVersion, log: &EventLog) -> Result<(), BuildError>;
}

/// Deploys a job, returning the image it now runs
#[async_trait]
pub trait JobBuilder: Send + Sync {
    async fn deploy(&self, job: &Job, opts: &JobDeployOptions, log: &EventLog) -> Result<String, BuildError>;
}
