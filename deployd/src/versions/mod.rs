//! App version lifecycle

pub mod fsm;
pub mod manager;
pub mod memory;
pub mod store;

pub use manager::{ensure_rollback_target, resolve, VersionManager, VersionSettings};
pub use memory::MemoryVersionStore;
pub use store::VersionStore;
