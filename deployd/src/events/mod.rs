//! Deploy audit events

pub mod history;
pub mod log;
pub mod memory;
pub mod store;

pub use history::{DeployData, DeployHistory};
pub use log::{EventLog, OutputSender, StreamFormat};
pub use memory::MemoryEventStore;
pub use store::{AllowedPermission, Event, EventFilter, EventOpts, EventStore, EventTarget, TargetType};
