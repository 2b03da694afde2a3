//! Deploy request models

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::deploy::kind;
use crate::errors::DeployError;

/// An uploaded archive attached to a deploy
#[derive(Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl ArchiveFile {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

// Archives can be large; keep them out of logs.
impl fmt::Debug for ArchiveFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveFile")
            .field("name", &self.name)
            .field("size", &self.data.len())
            .finish()
    }
}

/// Free-form label describing where a deploy came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    AppDeploy,
    DragAndDrop,
    Git,
    Image,
    Rebuild,
    Rollback,
    Upload,
    Dockerfile,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::AppDeploy => "app-deploy",
            Origin::DragAndDrop => "drag-and-drop",
            Origin::Git => "git",
            Origin::Image => "image",
            Origin::Rebuild => "rebuild",
            Origin::Rollback => "rollback",
            Origin::Upload => "upload",
            Origin::Dockerfile => "dockerfile",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Origin {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "app-deploy" => Ok(Origin::AppDeploy),
            "drag-and-drop" => Ok(Origin::DragAndDrop),
            "git" => Ok(Origin::Git),
            "image" => Ok(Origin::Image),
            "rebuild" => Ok(Origin::Rebuild),
            "rollback" => Ok(Origin::Rollback),
            "upload" => Ok(Origin::Upload),
            "dockerfile" => Ok(Origin::Dockerfile),
            _ => Err(DeployError::Validation(
                "Invalid deployment origin".to_string(),
            )),
        }
    }
}

/// Classification of a deploy request's primary source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeployKind {
    ArchiveUrl,
    Upload,
    Image,
    Dockerfile,
    Rollback,
    Rebuild,
    Build,
}

impl DeployKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployKind::ArchiveUrl => "archive-url",
            DeployKind::Upload => "upload",
            DeployKind::Image => "image",
            DeployKind::Dockerfile => "dockerfile",
            DeployKind::Rollback => "rollback",
            DeployKind::Rebuild => "rebuild",
            DeployKind::Build => "build",
        }
    }
}

impl fmt::Display for DeployKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized app deploy request
///
/// Empty strings mean "not provided". The deploy kind is always derived
/// through [`DeployOptions::kind`], never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployOptions {
    pub app: String,
    pub commit: String,
    pub archive_url: String,
    pub file: Option<ArchiveFile>,
    pub image: String,
    pub dockerfile: String,
    pub build: bool,
    pub rollback: bool,
    pub origin: Option<Origin>,
    pub user: String,
    pub message: String,
}

impl DeployOptions {
    pub fn kind(&self) -> DeployKind {
        kind::classify(self)
    }

    pub fn is_rebuild(&self) -> bool {
        self.origin == Some(Origin::Rebuild)
    }

    pub fn file_size(&self) -> u64 {
        self.file.as_ref().map(ArchiveFile::size).unwrap_or(0)
    }

    /// Custom data recorded when the deploy event opens
    pub fn start_custom_data(&self) -> Value {
        json!({
            "app.name": self.app,
            "commit": self.commit,
            "filesize": self.file_size(),
            "kind": self.kind().as_str(),
            "archiveurl": self.archive_url,
            "user": self.user,
            "image": self.image,
            "origin": self.origin.map(|o| o.as_str()).unwrap_or(""),
            "build": self.build,
            "rollback": self.rollback,
            "message": self.message,
        })
    }
}

/// Normalized job deploy request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDeployOptions {
    pub job: String,
    pub image: String,
    pub dockerfile: String,
    pub file: Option<ArchiveFile>,
    pub user: String,
    pub message: String,
}

impl JobDeployOptions {
    /// Jobs only ever deploy an image or a Dockerfile
    pub fn kind(&self) -> DeployKind {
        if self.image.is_empty() {
            DeployKind::Dockerfile
        } else {
            DeployKind::Image
        }
    }

    pub fn file_size(&self) -> u64 {
        self.file.as_ref().map(ArchiveFile::size).unwrap_or(0)
    }

    pub fn start_custom_data(&self) -> Value {
        json!({
            "jobname": self.job,
            "image": self.image,
            "dockerfile": self.dockerfile,
            "filesize": self.file_size(),
            "kind": self.kind().as_str(),
            "user": self.user,
            "message": self.message,
        })
    }
}
