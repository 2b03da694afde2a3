//! Event log writer
//!
//! Everything a build prints goes to the event's log and, while the caller is
//! still connected, to the streamed response body.

use std::sync::Arc;

use chrono::Utc;
use openapi_server::models::StreamMessage;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::events::store::EventStore;

/// Sender side of a streamed response body
pub type OutputSender = mpsc::UnboundedSender<String>;

/// Wire format of the streamed body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    /// Raw text lines
    Text,

    /// One `{"Message","Timestamp"}` object per line
    JsonLines,
}

impl StreamFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            StreamFormat::Text => "text",
            StreamFormat::JsonLines => "application/x-json-stream",
        }
    }

    fn render(&self, text: &str) -> String {
        match self {
            StreamFormat::Text => text.to_string(),
            StreamFormat::JsonLines => {
                let message = StreamMessage {
                    message: text.trim_end_matches('\n').to_string(),
                    timestamp: Utc::now(),
                };
                match serde_json::to_string(&message) {
                    Ok(json) => format!("{}\n", json),
                    Err(_) => text.to_string(),
                }
            }
        }
    }
}

/// Writer bound to one open event
#[derive(Clone)]
pub struct EventLog {
    event_id: Uuid,
    events: Arc<dyn EventStore>,
    output: Option<OutputSender>,
    format: StreamFormat,
}

impl EventLog {
    pub fn new(
        event_id: Uuid,
        events: Arc<dyn EventStore>,
        output: Option<OutputSender>,
        format: StreamFormat,
    ) -> Self {
        Self {
            event_id,
            events,
            output,
            format,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    /// Append raw text to the event log and forward it to the caller
    pub async fn write(&self, text: &str) {
        if let Err(e) = self.events.append_log(self.event_id, text).await {
            warn!("Failed to append to event {} log: {}", self.event_id, e);
        }
        if let Some(output) = &self.output {
            // The caller going away does not stop the attempt from being recorded.
            let _ = output.send(self.format.render(text));
        }
    }

    pub async fn line(&self, text: &str) {
        self.write(&format!("{}\n", text)).await;
    }
}
