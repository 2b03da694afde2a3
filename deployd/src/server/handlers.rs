//! HTTP request handlers

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use futures::stream;
use openapi_server::models::{
    DeployDataResponse, DeployForm, DeployListQuery, DeployQuery, HealthResponse, JobDeployForm,
    RebuildForm, RollbackForm, RollbackUpdateForm, VersionResponse,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::deploy::{
    resolve_deploy, resolve_job_deploy, resolve_rebuild, resolve_rollback,
    resolve_rollback_update, DeployOrchestrator, DeployRequest, JobDeployRequest, PreparedDeploy,
    ResolvedDeploy, RollbackUpdateRequest,
};
use crate::errors::DeployError;
use crate::events::StreamFormat;
use crate::models::deploy::ArchiveFile;
use crate::permission::User;
use crate::server::auth::CurrentUser;
use crate::server::state::ServerState;
use crate::utils::version_info;

const DIFF_DEPRECATED: &str = "diff deploy is deprecated, this call does nothing\n";

pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "deployd".to_string(),
        version: version.version,
    })
}

pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

/// Deploy from an archive URL, an uploaded file, an image or a Dockerfile
pub async fn deploy_handler(
    State(state): State<Arc<ServerState>>,
    Path(app): Path<String>,
    Query(query): Query<DeployQuery>,
    CurrentUser(user): CurrentUser,
    request: Request,
) -> Result<Response, DeployError> {
    let (form, file) = read_form::<DeployForm>(request).await?;
    let resolved = resolve_deploy(
        &app,
        DeployRequest {
            archive_url: form.archive_url,
            file,
            image: form.image,
            dockerfile: form.dockerfile,
            commit: form.commit,
            build: form.build,
            rollback: form.rollback,
            origin: query.origin.or(form.origin),
            user: form.user,
            message: form.message,
        },
    )?;
    start_app_deploy(&state, &user, resolved).await
}

pub async fn rollback_handler(
    State(state): State<Arc<ServerState>>,
    Path(app): Path<String>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<RollbackForm>,
) -> Result<Response, DeployError> {
    let resolved = resolve_rollback(&app, form.image, form.user, form.message)?;
    start_app_deploy(&state, &user, resolved).await
}

pub async fn rebuild_handler(
    State(state): State<Arc<ServerState>>,
    Path(app): Path<String>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<RebuildForm>,
) -> Result<Response, DeployError> {
    let resolved = resolve_rebuild(&app, form.user, form.message);
    start_app_deploy(&state, &user, resolved).await
}

pub async fn rollback_update_handler(
    State(state): State<Arc<ServerState>>,
    Path(app): Path<String>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<RollbackUpdateForm>,
) -> Result<StatusCode, DeployError> {
    let update = resolve_rollback_update(RollbackUpdateRequest {
        image: form.image,
        disable: form.disable,
        reason: form.reason,
    })?;
    state.deploys.update_rollback(&user, &app, update).await?;
    Ok(StatusCode::OK)
}

pub async fn diff_handler(CurrentUser(_): CurrentUser) -> impl IntoResponse {
    (StatusCode::GONE, DIFF_DEPRECATED)
}

pub async fn job_deploy_handler(
    State(state): State<Arc<ServerState>>,
    Path(job): Path<String>,
    CurrentUser(user): CurrentUser,
    request: Request,
) -> Result<Response, DeployError> {
    let (form, file) = read_form::<JobDeployForm>(request).await?;
    let options = resolve_job_deploy(
        &job,
        JobDeployRequest {
            image: form.image,
            dockerfile: form.dockerfile,
            file,
            user: form.user,
            message: form.message,
        },
    )?;
    let prepared = state.job_deploys.prepare(&user, options).await?;

    let (tx, rx) = mpsc::unbounded_channel();
    let watcher = tx.clone();
    let orchestrator = state.job_deploys.clone();
    tokio::spawn(async move {
        orchestrator
            .run(prepared, Some(tx), async move { watcher.closed().await })
            .await;
    });
    Ok(streamed(StreamFormat::Text, rx))
}

pub async fn list_deploys_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<DeployListQuery>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, DeployError> {
    let app = query.app.filter(|a| !a.is_empty());
    let deploys = state.history.list(&user, app.as_deref()).await?;
    if deploys.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    let body: Vec<DeployDataResponse> = deploys.into_iter().map(Into::into).collect();
    Ok(Json(body).into_response())
}

pub async fn deploy_info_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<DeployDataResponse>, DeployError> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| DeployError::NotFound("Deploy not found.".to_string()))?;
    let deploy = state.history.get(&user, id).await?;
    Ok(Json(deploy.into()))
}

async fn start_app_deploy(
    state: &ServerState,
    user: &User,
    resolved: ResolvedDeploy,
) -> Result<Response, DeployError> {
    let prepared = state.deploys.prepare(user, resolved).await?;
    Ok(stream_app_deploy(state.deploys.clone(), prepared))
}

/// Run the attempt in the background, streaming its output as the body.
/// The attempt is canceled when the client goes away.
fn stream_app_deploy(orchestrator: Arc<DeployOrchestrator>, prepared: PreparedDeploy) -> Response {
    let format = prepared.stream_format();
    let (tx, rx) = mpsc::unbounded_channel();
    let watcher = tx.clone();
    tokio::spawn(async move {
        orchestrator
            .run(prepared, Some(tx), async move { watcher.closed().await })
            .await;
    });
    streamed(format, rx)
}

fn streamed(format: StreamFormat, rx: mpsc::UnboundedReceiver<String>) -> Response {
    let body = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (Ok::<_, Infallible>(chunk), rx))
    });
    ([(CONTENT_TYPE, format.content_type())], Body::from_stream(body)).into_response()
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false)
}

/// Read a url-encoded or multipart form; multipart bodies may carry a `file`
async fn read_form<T: DeserializeOwned>(
    request: Request,
) -> Result<(T, Option<ArchiveFile>), DeployError> {
    let invalid = |e: &dyn std::fmt::Display| DeployError::Validation(e.to_string());

    if !is_multipart(&request) {
        let Form(form) = Form::<T>::from_request(request, &())
            .await
            .map_err(|e| invalid(&e))?;
        return Ok((form, None));
    }

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| invalid(&e))?;
    let mut fields = Map::new();
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| invalid(&e))? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or("archive.tar.gz").to_string();
            let data = field.bytes().await.map_err(|e| invalid(&e))?;
            file = Some(ArchiveFile::new(file_name, data.to_vec()));
        } else {
            let value = field.text().await.map_err(|e| invalid(&e))?;
            fields.insert(name, Value::String(value));
        }
    }

    let form = serde_json::from_value(Value::Object(fields)).map_err(|e| invalid(&e))?;
    Ok((form, file))
}
