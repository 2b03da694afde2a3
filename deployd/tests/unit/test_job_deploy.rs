//! Job deploy tests

use tokio::sync::mpsc;

use deployd::deploy::{resolve_job_deploy, JobDeployRequest};
use deployd::errors::DeployError;
use deployd::events::EventStore;
use deployd::models::deploy::JobDeployOptions;

use crate::support::{admin, reader, Harness};

fn image_job(job: &str) -> JobDeployOptions {
    resolve_job_deploy(
        job,
        JobDeployRequest {
            image: Some("registry/cron:2.0".to_string()),
            user: Some("someone-else@example.com".to_string()),
            ..Default::default()
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_image_job_deploy() {
    let harness = Harness::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let outcome = harness
        .job_deploys
        .deploy(&admin(), image_job("cron"), Some(tx))
        .await
        .unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.image.as_deref(), Some("registry/cron:2.0"));

    let mut output = String::new();
    while let Ok(chunk) = rx.try_recv() {
        output.push_str(&chunk);
    }
    assert!(output.ends_with("\nDeploy finished with success!\n"));

    let event = harness.events.get(outcome.event_id).await.unwrap().unwrap();
    assert!(!event.running);
    assert_eq!(event.target.to_string(), "job(cron)");
    assert_eq!(event.owner, "admin@example.com");
    assert_eq!(event.start_custom_data["user"], "admin@example.com");
    assert_eq!(event.end_custom_data["image"], "registry/cron:2.0");
    assert_eq!(event.log, output);
}

#[tokio::test]
async fn test_dockerfile_job_without_backend() {
    let harness = Harness::new();
    let options = resolve_job_deploy(
        "cron",
        JobDeployRequest {
            dockerfile: Some("FROM alpine".to_string()),
            ..Default::default()
        },
    )
    .unwrap();

    let outcome = harness
        .job_deploys
        .deploy(&admin(), options, None)
        .await
        .unwrap();
    assert!(!outcome.is_success());

    let event = harness.events.get(outcome.event_id).await.unwrap().unwrap();
    assert!(!event.running);
    assert!(event.log.contains("Failed to deploy job cron"));
    assert_eq!(event.error, outcome.error.unwrap());
}

#[tokio::test]
async fn test_unknown_job() {
    let harness = Harness::new();
    let err = harness
        .job_deploys
        .deploy(&admin(), image_job("missing"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::NotFound(_)));
    assert_eq!(err.to_string(), "Job missing not found.");
    assert!(harness.events.is_empty());
}

#[tokio::test]
async fn test_job_deploy_forbidden() {
    let harness = Harness::new();
    let err = harness
        .job_deploys
        .deploy(&reader(), image_job("cron"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Forbidden(_)));
    assert!(err.to_string().ends_with("in this job"));
    assert!(harness.events.is_empty());
}
