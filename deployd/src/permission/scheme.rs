//! Permission scheme tree and deploy scheme selection

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DeployError;
use crate::models::deploy::DeployOptions;

/// A node of the dotted permission tree, e.g. `app.deploy.image`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionScheme {
    /// Root of the tree, covers everything
    All,
    App,
    AppDeploy,
    AppDeployBuild,
    AppDeployDockerfile,
    AppDeployGit,
    AppDeployImage,
    AppDeployRebuild,
    AppDeployRollback,
    AppDeployUpload,
    AppRead,
    AppReadDeploy,
    AppReadEvents,
    AppUpdate,
    AppUpdateDeploy,
    AppUpdateDeployRollback,
    Job,
    JobDeploy,
}

const ALL_SCHEMES: [PermissionScheme; 18] = [
    PermissionScheme::All,
    PermissionScheme::App,
    PermissionScheme::AppDeploy,
    PermissionScheme::AppDeployBuild,
    PermissionScheme::AppDeployDockerfile,
    PermissionScheme::AppDeployGit,
    PermissionScheme::AppDeployImage,
    PermissionScheme::AppDeployRebuild,
    PermissionScheme::AppDeployRollback,
    PermissionScheme::AppDeployUpload,
    PermissionScheme::AppRead,
    PermissionScheme::AppReadDeploy,
    PermissionScheme::AppReadEvents,
    PermissionScheme::AppUpdate,
    PermissionScheme::AppUpdateDeploy,
    PermissionScheme::AppUpdateDeployRollback,
    PermissionScheme::Job,
    PermissionScheme::JobDeploy,
];

impl PermissionScheme {
    pub fn full_name(&self) -> &'static str {
        match self {
            PermissionScheme::All => "",
            PermissionScheme::App => "app",
            PermissionScheme::AppDeploy => "app.deploy",
            PermissionScheme::AppDeployBuild => "app.deploy.build",
            PermissionScheme::AppDeployDockerfile => "app.deploy.dockerfile",
            PermissionScheme::AppDeployGit => "app.deploy.git",
            PermissionScheme::AppDeployImage => "app.deploy.image",
            PermissionScheme::AppDeployRebuild => "app.deploy.rebuild",
            PermissionScheme::AppDeployRollback => "app.deploy.rollback",
            PermissionScheme::AppDeployUpload => "app.deploy.upload",
            PermissionScheme::AppRead => "app.read",
            PermissionScheme::AppReadDeploy => "app.read.deploy",
            PermissionScheme::AppReadEvents => "app.read.events",
            PermissionScheme::AppUpdate => "app.update",
            PermissionScheme::AppUpdateDeploy => "app.update.deploy",
            PermissionScheme::AppUpdateDeployRollback => "app.update.deploy.rollback",
            PermissionScheme::Job => "job",
            PermissionScheme::JobDeploy => "job.deploy",
        }
    }

    pub fn parent(&self) -> Option<PermissionScheme> {
        let name = self.full_name();
        if name.is_empty() {
            return None;
        }
        let parent = name.rsplit_once('.').map(|(p, _)| p).unwrap_or("");
        ALL_SCHEMES
            .iter()
            .copied()
            .find(|s| s.full_name() == parent)
    }

    /// Whether a grant on `grant` authorizes this scheme
    pub fn is_covered_by(&self, grant: PermissionScheme) -> bool {
        let mut current = Some(*self);
        while let Some(scheme) = current {
            if scheme == grant {
                return true;
            }
            current = scheme.parent();
        }
        false
    }
}

impl fmt::Display for PermissionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.full_name())
    }
}

impl FromStr for PermissionScheme {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_SCHEMES
            .iter()
            .copied()
            .find(|scheme| scheme.full_name() == s)
            .ok_or_else(|| DeployError::Config(format!("unregistered permission: {}", s)))
    }
}

impl Serialize for PermissionScheme {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.full_name())
    }
}

impl<'de> Deserialize<'de> for PermissionScheme {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Scope a permission is granted in
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PermissionContext {
    Global,
    App(String),
    Team(String),
    Pool(String),
    Job(String),
}

/// Scheme a caller must hold to run the given deploy.
///
/// Pure and total: only the request fields are inspected.
pub fn scheme_for_deploy(opts: &DeployOptions) -> PermissionScheme {
    if !opts.commit.is_empty() {
        PermissionScheme::AppDeployGit
    } else if !opts.image.is_empty() {
        PermissionScheme::AppDeployImage
    } else if !opts.dockerfile.is_empty() {
        PermissionScheme::AppDeployDockerfile
    } else if opts.file.is_some() {
        if opts.build {
            PermissionScheme::AppDeployBuild
        } else {
            PermissionScheme::AppDeployUpload
        }
    } else {
        PermissionScheme::AppDeploy
    }
}
