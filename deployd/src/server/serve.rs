//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::DeployError;
use crate::server::handlers::{
    deploy_handler, deploy_info_handler, diff_handler, health_handler, job_deploy_handler,
    list_deploys_handler, rebuild_handler, rollback_handler, rollback_update_handler,
    version_handler,
};
use crate::server::state::ServerState;

pub fn router(state: Arc<ServerState>, options: &ServerOptions) -> Router {
    Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // App deploys
        .route("/apps/{app}/deploy", post(deploy_handler))
        .route("/apps/{app}/deploy/rollback", post(rollback_handler))
        .route("/apps/{app}/deploy/rebuild", post(rebuild_handler))
        .route("/apps/{app}/deploy/rollback/update", put(rollback_update_handler))
        .route("/apps/{app}/diff", post(diff_handler))
        // Job deploys
        .route("/jobs/{job}/deploy", post(job_deploy_handler))
        // History
        .route("/deploys", get(list_deploys_handler))
        .route("/deploys/{id}", get(deploy_info_handler))
        // State and middleware
        .with_state(state)
        .layer(DefaultBodyLimit::max(options.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), DeployError>>, DeployError> {
    let app = router(state, options);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| DeployError::Server(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| DeployError::Server(e.to_string()))
    });

    Ok(handle)
}
