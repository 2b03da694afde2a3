//! In-memory event store

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::DeployError;
use crate::events::store::{Event, EventFilter, EventOpts, EventStore};

/// In-memory event store, events kept in insertion order
#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<Vec<Event>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an already built event, e.g. imported history
    pub fn insert(&self, event: Event) {
        let mut events = self.events.write().unwrap_or_else(|e| e.into_inner());
        events.push(event);
    }

    pub fn len(&self) -> usize {
        let events = self.events.read().unwrap_or_else(|e| e.into_inner());
        events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_event<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Event) -> Result<T, DeployError>,
    ) -> Result<T, DeployError> {
        let mut events = self.events.write().unwrap_or_else(|e| e.into_inner());
        let event = events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| DeployError::Storage(format!("event {} not found", id)))?;
        f(event)
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn open(&self, opts: EventOpts) -> Result<Event, DeployError> {
        let mut events = self.events.write().unwrap_or_else(|e| e.into_inner());

        if let Some(running) = events.iter().find(|e| e.running && e.target == opts.target) {
            return Err(DeployError::Conflict(format!(
                "event locked: {} running \"{}\" start by {} at {}, try again later",
                running.target,
                running.kind,
                running.owner,
                running.start_time.to_rfc3339()
            )));
        }

        let event = Event::new(opts);
        events.push(event.clone());
        Ok(event)
    }

    async fn append_log(&self, id: Uuid, text: &str) -> Result<(), DeployError> {
        self.with_event(id, |event| {
            event.log.push_str(text);
            Ok(())
        })
    }

    async fn close(
        &self,
        id: Uuid,
        end_custom_data: Value,
        error: Option<String>,
    ) -> Result<Event, DeployError> {
        self.with_event(id, |event| {
            if !event.running {
                return Err(DeployError::Storage(format!("event {} already closed", id)));
            }
            event.running = false;
            event.end_time = Some(Utc::now());
            event.end_custom_data = end_custom_data;
            event.error = error.unwrap_or_default();
            Ok(event.clone())
        })
    }

    async fn get(&self, id: Uuid) -> Result<Option<Event>, DeployError> {
        let events = self.events.read().unwrap_or_else(|e| e.into_inner());
        Ok(events.iter().find(|e| e.id == id).cloned())
    }

    async fn list(&self, filter: &EventFilter) -> Result<Vec<Event>, DeployError> {
        let events = self.events.read().unwrap_or_else(|e| e.into_inner());
        Ok(events.iter().filter(|e| filter.matches(e)).cloned().collect())
    }
}
