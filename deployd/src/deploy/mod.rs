//! Deploy module

pub mod attempt;
pub mod executor;
pub mod job;
pub mod kind;
pub mod request;

pub use executor::{required_scheme, stream_format, DeployOrchestrator, DeployOutcome, PreparedDeploy};
pub use job::{JobDeployOrchestrator, JobDeployOutcome, PreparedJobDeploy};
pub use request::{
    resolve_deploy, resolve_job_deploy, resolve_rebuild, resolve_rollback, resolve_rollback_update,
    DeployRequest, JobDeployRequest, ResolvedDeploy, RollbackUpdate, RollbackUpdateRequest,
};
