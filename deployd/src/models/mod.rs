//! Domain models

pub mod app;
pub mod deploy;
pub mod version;
