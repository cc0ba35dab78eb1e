//! Host events as JSON lines on stderr.

use async_trait::async_trait;
use chatplug_core::event::{EventEmitter, HostEvent};
use tracing::warn;

pub struct StderrEmitter;

#[async_trait]
impl EventEmitter for StderrEmitter {
    async fn emit(&self, event: HostEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => eprintln!("{line}"),
            Err(e) => warn!("Could not encode host event: {e}"),
        }
    }
}
