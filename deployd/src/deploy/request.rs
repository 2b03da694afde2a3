//! Deploy request resolution
//!
//! Turns loosely typed form input into validated [`DeployOptions`] before any
//! side effect happens.

use crate::errors::DeployError;
use crate::models::app::App;
use crate::models::deploy::{
    ArchiveFile, DeployKind, DeployOptions, JobDeployOptions, Origin,
};

/// Raw app deploy input, as received from a form or a structured call
#[derive(Debug, Clone, Default)]
pub struct DeployRequest {
    pub archive_url: Option<String>,
    pub file: Option<ArchiveFile>,
    pub image: Option<String>,
    pub dockerfile: Option<String>,
    pub commit: Option<String>,
    pub build: Option<String>,
    pub rollback: Option<String>,
    pub origin: Option<String>,
    pub user: Option<String>,
    pub message: Option<String>,
}

/// Raw job deploy input
#[derive(Debug, Clone, Default)]
pub struct JobDeployRequest {
    pub image: Option<String>,
    pub dockerfile: Option<String>,
    pub file: Option<ArchiveFile>,
    pub user: Option<String>,
    pub message: Option<String>,
}

/// Raw rollback-update input
#[derive(Debug, Clone, Default)]
pub struct RollbackUpdateRequest {
    pub image: Option<String>,
    pub disable: Option<String>,
    pub reason: Option<String>,
}

/// A validated rollback-update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackUpdate {
    pub reference: String,
    pub disable: bool,
    pub reason: String,
}

/// A validated deploy request together with its kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDeploy {
    pub options: DeployOptions,
    pub kind: DeployKind,
}

impl ResolvedDeploy {
    fn new(options: DeployOptions) -> Self {
        let kind = options.kind();
        Self { options, kind }
    }
}

const SOURCE_FIELDS: [&str; 4] = ["archive-url", "dockerfile", "image", "file"];

/// Each field excludes every field of its set.
const EXCLUSIVE_FIELDS: [(&str, &[&str]); 2] = [
    ("archive-url", &["dockerfile", "file", "image"]),
    ("image", &["archive-url", "dockerfile", "file"]),
];

const JOB_SOURCE_FIELDS: [&str; 2] = ["dockerfile", "image"];

const JOB_EXCLUSIVE_FIELDS: [(&str, &[&str]); 1] = [("image", &["dockerfile"])];

/// Which source fields a request carries
struct Sources<'a> {
    archive_url: &'a str,
    dockerfile: &'a str,
    image: &'a str,
    file: bool,
}

impl Sources<'_> {
    fn present(&self, field: &str) -> bool {
        match field {
            "archive-url" => !self.archive_url.is_empty(),
            "dockerfile" => !self.dockerfile.is_empty(),
            "image" => !self.image.is_empty(),
            "file" => self.file,
            _ => false,
        }
    }

    fn any(&self, fields: &[&str]) -> bool {
        fields.iter().any(|f| self.present(f))
    }

    fn check_exclusive(&self, rules: &[(&str, &[&str])]) -> Result<(), DeployError> {
        for (field, excluded) in rules {
            if self.present(field) && self.any(excluded) {
                return Err(DeployError::Validation(format!(
                    "Cannot set \"{}\" mutually with {}{}",
                    field,
                    quoted_list(excluded),
                    if excluded.len() > 1 { " fields" } else { "" },
                )));
            }
        }
        Ok(())
    }
}

/// Resolve a plain app deploy
pub fn resolve_deploy(app: &str, request: DeployRequest) -> Result<ResolvedDeploy, DeployError> {
    let archive_url = non_empty(request.archive_url);
    let image = non_empty(request.image);
    let dockerfile = non_empty(request.dockerfile);
    let rollback = parse_bool("rollback", request.rollback.as_deref())?;
    let build = parse_bool("build", request.build.as_deref())?;
    let mut origin = parse_origin(request.origin.as_deref())?;

    let sources = Sources {
        archive_url: &archive_url,
        dockerfile: &dockerfile,
        image: &image,
        file: request.file.is_some(),
    };
    let rebuild = origin == Some(Origin::Rebuild);
    if !rollback && !rebuild && !sources.any(&SOURCE_FIELDS) {
        return Err(DeployError::Validation(format!(
            "You must provide at least one of: {}",
            quoted_list(&SOURCE_FIELDS)
        )));
    }
    sources.check_exclusive(&EXCLUSIVE_FIELDS)?;

    if !image.is_empty() && !rollback {
        origin = Some(Origin::Image);
    }

    Ok(ResolvedDeploy::new(DeployOptions {
        app: app.to_string(),
        commit: non_empty(request.commit),
        archive_url,
        file: request.file,
        image,
        dockerfile,
        build,
        rollback,
        origin,
        user: non_empty(request.user),
        message: non_empty(request.message),
    }))
}

/// Resolve a rollback deploy; `reference` is `v<N>` or an image
pub fn resolve_rollback(
    app: &str,
    reference: Option<String>,
    user: Option<String>,
    message: Option<String>,
) -> Result<ResolvedDeploy, DeployError> {
    let reference = non_empty(reference);
    if reference.is_empty() {
        return Err(DeployError::Validation(
            "you cannot rollback without an image name".to_string(),
        ));
    }
    Ok(ResolvedDeploy::new(DeployOptions {
        app: app.to_string(),
        image: reference,
        rollback: true,
        origin: Some(Origin::Rollback),
        user: non_empty(user),
        message: non_empty(message),
        ..Default::default()
    }))
}

/// Resolve a rebuild of the app's current source
pub fn resolve_rebuild(
    app: &str,
    user: Option<String>,
    message: Option<String>,
) -> ResolvedDeploy {
    ResolvedDeploy::new(DeployOptions {
        app: app.to_string(),
        origin: Some(Origin::Rebuild),
        user: non_empty(user),
        message: non_empty(message),
        ..Default::default()
    })
}

/// Source deploys need a platform to build with
pub fn check_platform(app: &App, kind: DeployKind) -> Result<(), DeployError> {
    let needs_platform = !matches!(
        kind,
        DeployKind::Image | DeployKind::Dockerfile | DeployKind::Rollback
    );
    if needs_platform && !app.has_platform() {
        return Err(DeployError::Validation(
            "can't deploy app without platform, if it's not an image, dockerfile or rollback"
                .to_string(),
        ));
    }
    Ok(())
}

/// Resolve a job deploy
pub fn resolve_job_deploy(
    job: &str,
    request: JobDeployRequest,
) -> Result<JobDeployOptions, DeployError> {
    let image = non_empty(request.image);
    let dockerfile = non_empty(request.dockerfile);
    let sources = Sources {
        archive_url: "",
        dockerfile: &dockerfile,
        image: &image,
        file: request.file.is_some(),
    };
    if !sources.any(&JOB_SOURCE_FIELDS) {
        return Err(DeployError::Validation(format!(
            "You must provide at least one of: {}",
            quoted_list(&JOB_SOURCE_FIELDS)
        )));
    }
    sources.check_exclusive(&JOB_EXCLUSIVE_FIELDS)?;
    if !image.is_empty() && request.file.is_some() {
        return Err(DeployError::Validation(
            "Cannot set \"image\" mutually with \"file\"".to_string(),
        ));
    }

    Ok(JobDeployOptions {
        job: job.to_string(),
        image,
        dockerfile,
        file: request.file,
        user: non_empty(request.user),
        message: non_empty(request.message),
    })
}

/// Resolve a request to enable or disable a rollback target
pub fn resolve_rollback_update(
    request: RollbackUpdateRequest,
) -> Result<RollbackUpdate, DeployError> {
    let reference = non_empty(request.image);
    if reference.is_empty() {
        return Err(DeployError::Validation(
            "you must specify an image".to_string(),
        ));
    }
    Ok(RollbackUpdate {
        reference,
        disable: parse_bool("disable", request.disable.as_deref())?,
        reason: request.reason.unwrap_or_default(),
    })
}

fn non_empty(value: Option<String>) -> String {
    value.filter(|v| !v.trim().is_empty()).unwrap_or_default()
}

fn parse_origin(value: Option<&str>) -> Result<Option<Origin>, DeployError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(origin) => origin.parse().map(Some),
    }
}

fn parse_bool(field: &str, value: Option<&str>) -> Result<bool, DeployError> {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("false") | Some("0") => Ok(false),
        Some("true") | Some("1") => Ok(true),
        Some(other) => Err(DeployError::Validation(format!(
            "Invalid value for \"{}\": {}",
            field, other
        ))),
    }
}

/// `"a", "b" or "c"`
fn quoted_list(fields: &[&str]) -> String {
    let quoted: Vec<String> = fields.iter().map(|f| format!("\"{}\"", f)).collect();
    match quoted.split_last() {
        None => String::new(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} or {}", rest.join(", "), last),
    }
}
