//! deployd integration tests


mod test_history;
mod test_job_deploy;
mod test_orchestrator;
mod test_request;
mod test_version_fsm;
