//! deployd library
//!
//! Deploy-kind resolution and version lifecycle engine of a multi-tenant app
//! platform: request validation, permission scheme selection, per-app version
//! history and audit-event bound deploy attempts.

pub mod app;
pub mod builder;
pub mod deploy;
pub mod errors;
pub mod events;
pub mod logs;
pub mod models;
pub mod permission;
pub mod registry;
pub mod server;
pub mod storage;
pub mod utils;
pub mod versions;
