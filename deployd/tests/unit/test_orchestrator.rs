//! Deploy orchestrator tests

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_test::{assert_err, assert_ok};

use deployd::deploy::{
    resolve_deploy, resolve_rebuild, resolve_rollback, resolve_rollback_update, DeployRequest,
    RollbackUpdateRequest,
};
use deployd::errors::DeployError;
use deployd::events::EventStore;
use deployd::models::deploy::DeployKind;
use deployd::models::version::VersionStatus;
use deployd::permission::{Permission, PermissionContext, PermissionScheme, User};
use deployd::registry::AppRegistry;

use crate::support::{admin, Behaviour, Harness};

fn archive_deploy(app: &str) -> deployd::deploy::ResolvedDeploy {
    resolve_deploy(
        app,
        DeployRequest {
            archive_url: Some("https://example.com/app.tar.gz".to_string()),
            commit: Some("abc123".to_string()),
            ..Default::default()
        },
    )
    .unwrap()
}

async fn deploy_twice(harness: &Harness) {
    for _ in 0..2 {
        let outcome = harness
            .deploys
            .deploy(&admin(), archive_deploy("web"), None)
            .await
            .unwrap();
        assert!(outcome.is_success());
    }
}

#[tokio::test]
async fn test_successful_deploy() {
    let harness = Harness::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let outcome = harness
        .deploys
        .deploy(&admin(), archive_deploy("web"), Some(tx))
        .await
        .unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.kind, DeployKind::ArchiveUrl);
    assert_eq!(outcome.version, Some(1));
    assert_eq!(outcome.image.as_deref(), Some("deployd/app-web:v1"));

    let versions = harness.versions.versions("web").await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].status, VersionStatus::Successful);
    assert_eq!(versions[0].event_id, Some(outcome.event_id));
    assert_eq!(harness.apps.get("web").await.unwrap().unwrap().deploys, 1);

    let event = harness.events.get(outcome.event_id).await.unwrap().unwrap();
    assert!(!event.running);
    assert!(event.error.is_empty());
    assert_eq!(event.end_custom_data["image"], "deployd/app-web:v1");
    assert_eq!(event.start_custom_data["commit"], "abc123");
    assert_eq!(event.start_custom_data["user"], "admin@example.com");
    assert!(event.log.ends_with("OK\n"));

    let mut streamed = String::new();
    while let Ok(chunk) = rx.try_recv() {
        streamed.push_str(&chunk);
    }
    assert_eq!(streamed, event.log);
}

#[tokio::test]
async fn test_failed_build_is_recorded() {
    let harness = Harness::with_behaviour(Behaviour::Fail);

    let outcome = harness
        .deploys
        .deploy(&admin(), archive_deploy("web"), None)
        .await
        .unwrap();

    assert_eq!(outcome.error.as_deref(), Some("exit status 1"));
    assert_eq!(outcome.version, None);

    let versions = harness.versions.versions("web").await.unwrap();
    assert_eq!(versions[0].status, VersionStatus::Abandoned);
    assert_eq!(
        versions[0].build_image.as_deref(),
        Some("deployd/app-web:v1-builder")
    );

    let event = harness.events.get(outcome.event_id).await.unwrap().unwrap();
    assert!(!event.running);
    assert_eq!(event.error, "exit status 1");
    assert!(event.log.ends_with("ERROR: exit status 1\n"));
    assert_eq!(harness.apps.get("web").await.unwrap().unwrap().deploys, 0);
}

#[tokio::test]
async fn test_ordinals_are_never_reused() {
    let failing = Harness::with_behaviour(Behaviour::Fail);
    for _ in 0..2 {
        failing
            .deploys
            .deploy(&admin(), archive_deploy("web"), None)
            .await
            .unwrap();
    }
    let ordinals: Vec<u32> = failing
        .versions
        .versions("web")
        .await
        .unwrap()
        .iter()
        .map(|v| v.version)
        .collect();
    assert_eq!(ordinals, vec![1, 2]);
}

#[tokio::test]
async fn test_image_deploy_without_platform() {
    let harness = Harness::new();
    let resolved = resolve_deploy(
        "bare",
        DeployRequest {
            image: Some("registry.example.com/bare:1.0".to_string()),
            ..Default::default()
        },
    )
    .unwrap();

    let outcome = harness.deploys.deploy(&admin(), resolved, None).await.unwrap();
    assert!(outcome.is_success());

    let event = harness.events.get(outcome.event_id).await.unwrap().unwrap();
    assert_eq!(event.start_custom_data["origin"], "image");
    assert_eq!(event.start_custom_data["kind"], "image");

    let version = &harness.versions.versions("bare").await.unwrap()[0];
    assert_eq!(version.build_image.as_deref(), Some("registry.example.com/bare:1.0"));
    assert_eq!(version.base_image.as_deref(), Some("deployd/app-bare:v1"));
    assert_eq!(harness.builder.calls(), 0);
}

#[tokio::test]
async fn test_source_deploy_requires_platform() {
    let harness = Harness::new();
    let err = harness
        .deploys
        .prepare(&admin(), archive_deploy("bare"))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "can't deploy app without platform, if it's not an image, dockerfile or rollback"
    );
    assert!(harness.events.is_empty());
}

#[tokio::test]
async fn test_rebuild_uses_builder() {
    let harness = Harness::new();
    let outcome = harness
        .deploys
        .deploy(&admin(), resolve_rebuild("web", None, None), None)
        .await
        .unwrap();
    assert_eq!(outcome.kind, DeployKind::Rebuild);
    assert!(outcome.is_success());
    assert_eq!(harness.builder.calls(), 1);
}

#[tokio::test]
async fn test_unknown_app() {
    let harness = Harness::new();
    let err = harness
        .deploys
        .prepare(&admin(), archive_deploy("ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::NotFound(ref m) if m == "App not found"));
}

#[tokio::test]
async fn test_forbidden_before_any_side_effect() {
    let harness = Harness::new();
    let user = User::new("dev@example.com").with_permission(Permission::new(
        PermissionScheme::AppDeployImage,
        PermissionContext::App("web".to_string()),
    ));

    let err = harness
        .deploys
        .prepare(&user, archive_deploy("web"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), http::StatusCode::FORBIDDEN);
    assert!(harness.events.is_empty());
    assert!(harness.versions.versions("web").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_git_deploy_needs_git_scheme() {
    let harness = Harness::new();
    let user = User::new("dev@example.com").with_permission(Permission::new(
        PermissionScheme::AppDeployGit,
        PermissionContext::Pool("prod".to_string()),
    ));
    assert_ok!(harness.deploys.prepare(&user, archive_deploy("web")).await);
}

#[tokio::test]
async fn test_concurrent_deploy_conflicts() {
    let harness = Harness::new();
    let first = harness
        .deploys
        .prepare(&admin(), archive_deploy("web"))
        .await
        .unwrap();

    let err = harness
        .deploys
        .prepare(&admin(), archive_deploy("web"))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.status_code(), http::StatusCode::CONFLICT);

    // Other apps are unaffected
    assert_ok!(harness.deploys.prepare(&admin(), archive_deploy("other")).await);

    let outcome = harness
        .deploys
        .run(first, None, std::future::pending())
        .await;
    assert!(outcome.is_success());
    assert_ok!(harness.deploys.prepare(&admin(), archive_deploy("web")).await);
}

#[tokio::test]
async fn test_rollback_reuses_version() {
    let harness = Harness::new();
    deploy_twice(&harness).await;

    let rollback = resolve_rollback("web", Some("v1".to_string()), None, None).unwrap();
    let outcome = harness.deploys.deploy(&admin(), rollback, None).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.kind, DeployKind::Rollback);
    assert_eq!(outcome.version, Some(1));
    assert_eq!(harness.versions.versions("web").await.unwrap().len(), 2);
    assert_eq!(harness.builder.calls(), 2);
    assert_eq!(harness.apps.get("web").await.unwrap().unwrap().deploys, 3);

    let event = harness.events.get(outcome.event_id).await.unwrap().unwrap();
    assert_eq!(event.end_custom_data["version"], 1);
}

#[tokio::test]
async fn test_rollback_by_image() {
    let harness = Harness::new();
    deploy_twice(&harness).await;

    let rollback =
        resolve_rollback("web", Some("deployd/app-web:v2".to_string()), None, None).unwrap();
    let outcome = harness.deploys.deploy(&admin(), rollback, None).await.unwrap();
    assert_eq!(outcome.version, Some(2));
}

#[tokio::test]
async fn test_rollback_to_unknown_version() {
    let harness = Harness::new();

    let rollback = resolve_rollback("web", Some("v1".to_string()), None, None).unwrap();
    let err = harness.deploys.prepare(&admin(), rollback).await.unwrap_err();
    assert_eq!(err.to_string(), "no versions available for app");

    deploy_twice(&harness).await;
    let rollback = resolve_rollback("web", Some("v9".to_string()), None, None).unwrap();
    let err = harness.deploys.prepare(&admin(), rollback).await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid version: v9");
    assert_eq!(err.status_code(), http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rollback_to_disabled_version() {
    let harness = Harness::new();
    deploy_twice(&harness).await;

    let update = resolve_rollback_update(RollbackUpdateRequest {
        image: Some("v1".to_string()),
        disable: Some("true".to_string()),
        reason: Some("leaks memory".to_string()),
    })
    .unwrap();
    let version = harness
        .deploys
        .update_rollback(&admin(), "web", update)
        .await
        .unwrap();
    assert!(version.disabled);

    let rollback = resolve_rollback("web", Some("v1".to_string()), None, None).unwrap();
    let err = harness.deploys.prepare(&admin(), rollback).await.unwrap_err();
    assert_eq!(err.to_string(), "version v1 is disabled for rollback: leaks memory");
}

#[tokio::test]
async fn test_update_rollback_rules() {
    let harness = Harness::new();
    deploy_twice(&harness).await;

    let update = resolve_rollback_update(RollbackUpdateRequest {
        image: Some("v1".to_string()),
        disable: Some("true".to_string()),
        reason: None,
    })
    .unwrap();
    let err = harness
        .deploys
        .update_rollback(&admin(), "web", update)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Reason cannot be empty while disabling a image rollback"
    );

    // Enabling an enabled version needs no reason
    let update = resolve_rollback_update(RollbackUpdateRequest {
        image: Some("v1".to_string()),
        disable: Some("false".to_string()),
        reason: None,
    })
    .unwrap();
    let version = harness
        .deploys
        .update_rollback(&admin(), "web", update)
        .await
        .unwrap();
    assert!(!version.disabled);

    let update = resolve_rollback_update(RollbackUpdateRequest {
        image: Some("v2".to_string()),
        disable: Some("true".to_string()),
        reason: Some("bad".to_string()),
    })
    .unwrap();
    let reader = crate::support::reader();
    assert_err!(harness.deploys.update_rollback(&reader, "web", update).await);
}

#[tokio::test]
async fn test_cancellation_abandons_version() {
    let harness = Harness::with_behaviour(Behaviour::Hang);
    let prepared = harness
        .deploys
        .prepare(&admin(), archive_deploy("web"))
        .await
        .unwrap();

    let outcome = harness
        .deploys
        .run(prepared, None, tokio::time::sleep(Duration::from_millis(50)))
        .await;
    assert_eq!(outcome.error.as_deref(), Some("deploy canceled by the client"));

    let versions = harness.versions.versions("web").await.unwrap();
    assert_eq!(versions[0].status, VersionStatus::Abandoned);

    let event = harness.events.get(outcome.event_id).await.unwrap().unwrap();
    assert!(!event.running);
    assert_eq!(event.error, "deploy canceled by the client");
}

#[tokio::test]
async fn test_dropped_attempt_is_finalized() {
    let harness = Harness::with_behaviour(Behaviour::Hang);
    let prepared = harness
        .deploys
        .prepare(&admin(), archive_deploy("web"))
        .await
        .unwrap();
    let event_id = prepared.event_id();

    let deploys = harness.deploys.clone();
    let task = tokio::spawn(async move {
        deploys.run(prepared, None, std::future::pending()).await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    let event = harness.wait_until_closed(event_id).await;
    assert!(!event.error.is_empty());

    let versions = harness.versions.versions("web").await.unwrap();
    assert_eq!(versions[0].status, VersionStatus::Abandoned);

    // The app is free for the next attempt
    assert_ok!(harness.deploys.prepare(&admin(), archive_deploy("web")).await);
}
