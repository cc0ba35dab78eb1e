//! Host events: status and citation notifications sent back to the chat UI.
//!
//! The host hands every filter and tool an event sink. Emitting is
//! fire-and-forget; nothing is returned and nothing is awaited beyond
//! the hand-off itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// A notification for the host UI.
///
/// Serializes as `{"type": "status" | "citation", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum HostEvent {
    Status(StatusData),
    Citation(CitationData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusData {
    pub description: String,
    pub status: String,
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationData {
    pub document: Vec<String>,
    pub metadata: Vec<CitationMetadata>,
    pub source: CitationSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationMetadata {
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationSource {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl HostEvent {
    pub fn status(description: impl Into<String>, status: impl Into<String>, done: bool) -> Self {
        Self::Status(StatusData {
            description: description.into(),
            status: status.into(),
            done,
        })
    }

    /// A citation with a single document and a single metadata source.
    pub fn citation(
        document: impl Into<String>,
        metadata_source: impl Into<String>,
        source_name: impl Into<String>,
        url: Option<String>,
    ) -> Self {
        Self::Citation(CitationData {
            document: vec![document.into()],
            metadata: vec![CitationMetadata {
                source: metadata_source.into(),
            }],
            source: CitationSource {
                name: source_name.into(),
                url,
            },
        })
    }
}

/// Sink for host events.
#[async_trait]
pub trait EventEmitter: Send + Sync {
    async fn emit(&self, event: HostEvent);
}

/// Drops every event. Used when the host supplies no sink.
pub struct NoopEmitter;

#[async_trait]
impl EventEmitter for NoopEmitter {
    async fn emit(&self, _event: HostEvent) {}
}

/// Keeps every event in order, for inspecting what a filter or tool reported.
#[derive(Default)]
pub struct CollectingEmitter {
    events: Mutex<Vec<HostEvent>>,
}

impl CollectingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events emitted so far.
    pub fn events(&self) -> Vec<HostEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventEmitter for CollectingEmitter {
    async fn emit(&self, event: HostEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
