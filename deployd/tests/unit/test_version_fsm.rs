//! Version FSM tests

use deployd::models::version::VersionStatus;
use deployd::versions::fsm::{VersionEvent, VersionFsm};

#[test]
fn test_fsm_initial_state() {
    let fsm = VersionFsm::new();
    assert_eq!(fsm.status(), VersionStatus::Pending);
    assert!(!fsm.status().is_terminal());
}

#[test]
fn test_fsm_abandon_from_any_unfinished_state() {
    for status in [
        VersionStatus::Pending,
        VersionStatus::BuildImageCommitted,
        VersionStatus::BaseImageCommitted,
    ] {
        let mut fsm = VersionFsm::from_status(status);
        fsm.process(VersionEvent::Abandon).unwrap();
        assert_eq!(fsm.status(), VersionStatus::Abandoned);
    }
}

#[test]
fn test_fsm_abandoned_is_terminal() {
    let mut fsm = VersionFsm::new();
    fsm.process(VersionEvent::Abandon).unwrap();
    assert!(fsm.status().is_terminal());

    // Abandoning again is accepted, nothing else is
    fsm.process(VersionEvent::Abandon).unwrap();
    assert!(fsm.process(VersionEvent::CommitBuildImage).is_err());
    assert_eq!(fsm.status(), VersionStatus::Abandoned);
}

#[test]
fn test_fsm_build_image_committed_twice() {
    let mut fsm = VersionFsm::new();
    fsm.process(VersionEvent::CommitBuildImage).unwrap();
    let err = fsm.process(VersionEvent::CommitBuildImage).unwrap_err();
    assert!(err.contains("build-image-committed"));
}

#[test]
fn test_status_serde() {
    assert_eq!(
        serde_json::to_string(&VersionStatus::BaseImageCommitted).unwrap(),
        "\"base-image-committed\""
    );
    assert_eq!(VersionStatus::Successful.to_string(), "successful");
}
