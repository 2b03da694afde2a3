//! Request resolution and scheme selection tests

use deployd::deploy::{
    required_scheme, resolve_deploy, resolve_job_deploy, resolve_rebuild, resolve_rollback,
    resolve_rollback_update, DeployRequest, JobDeployRequest, RollbackUpdateRequest,
};
use deployd::errors::DeployError;
use deployd::models::deploy::{ArchiveFile, DeployKind, Origin};
use deployd::permission::{scheme_for_deploy, PermissionScheme};

fn some(value: &str) -> Option<String> {
    Some(value.to_string())
}

fn file() -> Option<ArchiveFile> {
    Some(ArchiveFile::new("archive.tar.gz", vec![0u8; 16]))
}

fn message(result: Result<impl std::fmt::Debug, DeployError>) -> String {
    match result.unwrap_err() {
        DeployError::Validation(message) => message,
        other => panic!("expected a validation error, got {:?}", other),
    }
}

#[test]
fn test_archive_url_excludes_image() {
    let result = resolve_deploy(
        "web",
        DeployRequest {
            archive_url: some("https://example.com/app.tar.gz"),
            image: some("registry/app:v1"),
            ..Default::default()
        },
    );
    assert_eq!(
        message(result),
        "Cannot set \"archive-url\" mutually with \"dockerfile\", \"file\" or \"image\" fields"
    );
}

#[test]
fn test_image_excludes_dockerfile() {
    let result = resolve_deploy(
        "web",
        DeployRequest {
            image: some("registry/app:v1"),
            dockerfile: some("FROM scratch"),
            ..Default::default()
        },
    );
    assert_eq!(
        message(result),
        "Cannot set \"image\" mutually with \"archive-url\", \"dockerfile\" or \"file\" fields"
    );
}

#[test]
fn test_source_is_mandatory() {
    let result = resolve_deploy("web", DeployRequest::default());
    assert_eq!(
        message(result),
        "You must provide at least one of: \"archive-url\", \"dockerfile\", \"image\" or \"file\""
    );

    // Commit alone is not a source
    let result = resolve_deploy(
        "web",
        DeployRequest {
            commit: some("abc123"),
            ..Default::default()
        },
    );
    assert!(result.is_err());
}

#[test]
fn test_dockerfile_with_file() {
    let resolved = resolve_deploy(
        "web",
        DeployRequest {
            dockerfile: some("FROM python:3"),
            file: file(),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(resolved.kind, DeployKind::Dockerfile);
    assert_eq!(required_scheme(&resolved), PermissionScheme::AppDeployDockerfile);
}

#[test]
fn test_file_with_build_flag() {
    let resolved = resolve_deploy(
        "web",
        DeployRequest {
            file: file(),
            build: some("true"),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(resolved.kind, DeployKind::Upload);
    assert_eq!(scheme_for_deploy(&resolved.options), PermissionScheme::AppDeployBuild);
}

#[test]
fn test_scheme_selection() {
    let cases = [
        (
            DeployRequest {
                archive_url: some("https://example.com/app.tar.gz"),
                commit: some("abc123"),
                ..Default::default()
            },
            PermissionScheme::AppDeployGit,
        ),
        (
            DeployRequest {
                image: some("registry/app:v1"),
                ..Default::default()
            },
            PermissionScheme::AppDeployImage,
        ),
        (
            DeployRequest {
                file: file(),
                ..Default::default()
            },
            PermissionScheme::AppDeployUpload,
        ),
        (
            DeployRequest {
                dockerfile: some("FROM scratch"),
                ..Default::default()
            },
            PermissionScheme::AppDeployDockerfile,
        ),
        (
            DeployRequest {
                archive_url: some("https://example.com/app.tar.gz"),
                ..Default::default()
            },
            PermissionScheme::AppDeploy,
        ),
    ];

    for (request, expected) in cases {
        let resolved = resolve_deploy("web", request).unwrap();
        assert_eq!(scheme_for_deploy(&resolved.options), expected);
        // Same input, same answer
        assert_eq!(scheme_for_deploy(&resolved.options), expected);
        assert_eq!(resolved.options.kind(), resolved.kind);
    }
}

#[test]
fn test_image_sets_origin() {
    let resolved = resolve_deploy(
        "web",
        DeployRequest {
            image: some("registry/app:v1"),
            origin: some("app-deploy"),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(resolved.options.origin, Some(Origin::Image));
}

#[test]
fn test_drag_and_drop_origin_is_kept() {
    let resolved = resolve_deploy(
        "web",
        DeployRequest {
            file: file(),
            origin: some("drag-and-drop"),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(resolved.kind, DeployKind::Upload);
    assert_eq!(resolved.options.origin, Some(Origin::DragAndDrop));
}

#[test]
fn test_invalid_origin() {
    let result = resolve_deploy(
        "web",
        DeployRequest {
            archive_url: some("https://example.com/app.tar.gz"),
            origin: some("carrier-pigeon"),
            ..Default::default()
        },
    );
    assert_eq!(message(result), "Invalid deployment origin");
}

#[test]
fn test_rebuild_origin_needs_no_source() {
    let resolved = resolve_deploy(
        "web",
        DeployRequest {
            origin: some("rebuild"),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(resolved.kind, DeployKind::Rebuild);
    assert_eq!(resolve_rebuild("web", None, None), resolved);
    assert_eq!(required_scheme(&resolved), PermissionScheme::AppDeployRebuild);
}

#[test]
fn test_rollback() {
    let resolved = resolve_rollback("web", some("v2"), some("ops"), some("revert")).unwrap();
    assert_eq!(resolved.kind, DeployKind::Rollback);
    assert_eq!(resolved.options.origin, Some(Origin::Rollback));
    assert_eq!(resolved.options.image, "v2");
    assert_eq!(required_scheme(&resolved), PermissionScheme::AppDeployRollback);

    let result = resolve_rollback("web", some(" "), None, None);
    assert_eq!(message(result), "you cannot rollback without an image name");
}

#[test]
fn test_rollback_update() {
    let update = resolve_rollback_update(RollbackUpdateRequest {
        image: some("v1"),
        disable: some("true"),
        reason: some("broken"),
    })
    .unwrap();
    assert!(update.disable);
    assert_eq!(update.reference, "v1");

    let result = resolve_rollback_update(RollbackUpdateRequest::default());
    assert_eq!(message(result), "you must specify an image");
}

#[test]
fn test_job_deploy_sources() {
    let result = resolve_job_deploy(
        "cron",
        JobDeployRequest {
            image: some("registry/job:v1"),
            dockerfile: some("FROM scratch"),
            ..Default::default()
        },
    );
    assert_eq!(message(result), "Cannot set \"image\" mutually with \"dockerfile\"");

    let result = resolve_job_deploy("cron", JobDeployRequest::default());
    assert_eq!(
        message(result),
        "You must provide at least one of: \"dockerfile\" or \"image\""
    );

    let options = resolve_job_deploy(
        "cron",
        JobDeployRequest {
            dockerfile: some("FROM scratch"),
            file: file(),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(options.kind(), DeployKind::Dockerfile);
    assert_eq!(options.start_custom_data()["filesize"], 16);
}
