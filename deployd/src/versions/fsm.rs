//! Commit protocol state machine for app versions

use crate::models::version::VersionStatus;

/// Step of the commit protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionEvent {
    /// Intermediate build image recorded
    CommitBuildImage,

    /// Final image pushed
    CommitBaseImage,

    /// Version usable for traffic and rollback
    CommitSuccessful,

    /// Build failed, was canceled or never committed
    Abandon,
}

/// Version FSM
#[derive(Debug, Clone)]
pub struct VersionFsm {
    status: VersionStatus,
}

impl VersionFsm {
    /// Create a new FSM in pending state
    pub fn new() -> Self {
        Self::from_status(VersionStatus::Pending)
    }

    pub fn from_status(status: VersionStatus) -> Self {
        Self { status }
    }

    pub fn status(&self) -> VersionStatus {
        self.status
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: VersionEvent) -> Result<(), String> {
        let new_status = match (self.status, event) {
            (VersionStatus::Pending, VersionEvent::CommitBuildImage) => {
                VersionStatus::BuildImageCommitted
            }
            (VersionStatus::BuildImageCommitted, VersionEvent::CommitBaseImage) => {
                VersionStatus::BaseImageCommitted
            }
            (VersionStatus::BaseImageCommitted, VersionEvent::CommitSuccessful) => {
                VersionStatus::Successful
            }

            // Any unfinished version can be abandoned, abandoning twice is a no-op
            (
                VersionStatus::Pending
                | VersionStatus::BuildImageCommitted
                | VersionStatus::BaseImageCommitted
                | VersionStatus::Abandoned,
                VersionEvent::Abandon,
            ) => VersionStatus::Abandoned,

            (status, event) => {
                return Err(format!("{} -> {:?}", status, event));
            }
        };

        self.status = new_status;
        Ok(())
    }
}

impl Default for VersionFsm {
    fn default() -> Self {
        Self::new()
    }
}
