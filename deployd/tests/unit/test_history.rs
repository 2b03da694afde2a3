//! Deploy history tests

use deployd::deploy::{resolve_deploy, DeployRequest, ResolvedDeploy};
use deployd::errors::DeployError;

use crate::support::{admin, reader, Behaviour, Harness};

fn image_deploy(app: &str, image: &str) -> ResolvedDeploy {
    resolve_deploy(
        app,
        DeployRequest {
            image: Some(image.to_string()),
            message: Some("ship it".to_string()),
            ..Default::default()
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_list_newest_first() {
    let harness = Harness::new();
    let first = harness
        .deploys
        .deploy(&admin(), image_deploy("web", "registry/web:1.0"), None)
        .await
        .unwrap();
    let second = harness
        .deploys
        .deploy(&admin(), image_deploy("web", "registry/web:1.1"), None)
        .await
        .unwrap();

    let deploys = harness.history.list(&admin(), Some("web")).await.unwrap();
    assert_eq!(deploys.len(), 2);
    assert_eq!(deploys[0].id, second.event_id);
    assert_eq!(deploys[1].id, first.event_id);

    let latest = &deploys[0];
    assert_eq!(latest.app, "web");
    assert_eq!(latest.version, 2);
    assert_eq!(latest.image, "deployd/app-web:v2");
    assert_eq!(latest.user, "admin@example.com");
    assert_eq!(latest.origin, "image");
    assert_eq!(latest.message, "ship it");
    assert!(latest.can_rollback);
    assert!(latest.log.contains("OK"));
}

#[tokio::test]
async fn test_failed_deploy_in_history() {
    let harness = Harness::with_behaviour(Behaviour::Fail);
    let outcome = harness
        .deploys
        .deploy(
            &admin(),
            resolve_deploy(
                "web",
                DeployRequest {
                    archive_url: Some("https://example.com/app.tar.gz".to_string()),
                    ..Default::default()
                },
            )
            .unwrap(),
            None,
        )
        .await
        .unwrap();
    assert!(!outcome.is_success());

    let data = harness.history.get(&admin(), outcome.event_id).await.unwrap();
    assert!(data.error.contains("exit status 1"));
    assert!(!data.can_rollback);
}

#[tokio::test]
async fn test_list_filters_by_visibility() {
    let harness = Harness::new();
    harness
        .deploys
        .deploy(&admin(), image_deploy("web", "registry/web:1.0"), None)
        .await
        .unwrap();
    harness
        .deploys
        .deploy(&admin(), image_deploy("other", "registry/other:1.0"), None)
        .await
        .unwrap();

    assert_eq!(harness.history.list(&admin(), None).await.unwrap().len(), 2);

    let visible = harness.history.list(&reader(), None).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].app, "web");

    assert!(harness
        .history
        .list(&reader(), Some("other"))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_job_deploys_are_not_listed() {
    let harness = Harness::new();
    let outcome = harness
        .job_deploys
        .deploy(
            &admin(),
            deployd::deploy::resolve_job_deploy(
                "cron",
                deployd::deploy::JobDeployRequest {
                    image: Some("registry/cron:1.0".to_string()),
                    ..Default::default()
                },
            )
            .unwrap(),
            None,
        )
        .await
        .unwrap();

    assert!(harness.history.list(&admin(), None).await.unwrap().is_empty());
    let err = harness.history.get(&admin(), outcome.event_id).await.unwrap_err();
    assert_eq!(err.to_string(), "Deploy not found.");
}

#[tokio::test]
async fn test_get() {
    let harness = Harness::new();
    let outcome = harness
        .deploys
        .deploy(&admin(), image_deploy("other", "registry/other:1.0"), None)
        .await
        .unwrap();

    let data = harness.history.get(&admin(), outcome.event_id).await.unwrap();
    assert_eq!(data.id, outcome.event_id);
    assert_eq!(data.app, "other");

    // Hidden deploys look exactly like missing ones
    let err = harness
        .history
        .get(&reader(), outcome.event_id)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::NotFound(_)));
    assert_eq!(err.to_string(), "Deploy not found.");

    let err = harness
        .history
        .get(&admin(), uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::NotFound(_)));
    assert_eq!(err.to_string(), "Deploy not found.");
}
