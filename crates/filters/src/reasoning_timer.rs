//! Reasoning timer: shows "Thinking..." while the model works, then
//! replaces it with how long the first token took.
//!
//! State is kept per request id, so overlapping requests each get their
//! own clock. A clock is dropped as soon as its first chunk is reported.

use async_trait::async_trait;
use chatplug_config::ReasoningConfig;
use chatplug_core::error::FilterError;
use chatplug_core::event::HostEvent;
use chatplug_core::filter::{Filter, FilterContext};
use chatplug_core::message::{ChatRequest, RequestId, StreamEvent};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Start times of requests still waiting for their first chunk.
pub struct ReasoningTimerFilter {
    config: ReasoningConfig,
    clocks: Mutex<HashMap<RequestId, Instant>>,
}

impl ReasoningTimerFilter {
    pub fn new(config: ReasoningConfig) -> Self {
        Self {
            config,
            clocks: Mutex::new(HashMap::new()),
        }
    }

    /// Number of requests currently being timed.
    pub fn in_flight(&self) -> usize {
        self.clocks().len()
    }

    fn clocks(&self) -> MutexGuard<'_, HashMap<RequestId, Instant>> {
        // A poisoned map only ever holds plain timestamps
        self.clocks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stops the clock for `request` and returns the elapsed time, or `None`
    /// if the request is unknown or already past its first chunk.
    fn take_first_chunk(&self, request: &RequestId) -> Option<Duration> {
        self.clocks()
            .remove(request)
            .map(|started_at| started_at.elapsed())
    }
}

impl Default for ReasoningTimerFilter {
    fn default() -> Self {
        Self::new(ReasoningConfig::default())
    }
}

#[async_trait]
impl Filter for ReasoningTimerFilter {
    fn name(&self) -> &str {
        "reasoning_timer"
    }

    async fn inlet(&self, _body: &mut ChatRequest, ctx: &FilterContext) -> Result<(), FilterError> {
        let previous = self.clocks().insert(ctx.request_id.clone(), Instant::now());
        if previous.is_some() {
            warn!(request = %ctx.request_id, "Request re-entered inlet; restarting its timer");
        }

        ctx.emit(HostEvent::status(
            self.config.reasoning_text.clone(),
            "in_progress",
            false,
        ))
        .await;
        Ok(())
    }

    async fn stream(&self, _event: &mut StreamEvent, ctx: &FilterContext) -> Result<(), FilterError> {
        let Some(elapsed) = self.take_first_chunk(&ctx.request_id) else {
            return Ok(());
        };

        let message = format!("Thought for {}", format_duration(elapsed.as_secs_f64()));
        debug!(request = %ctx.request_id, %message, "First chunk received");
        ctx.emit(HostEvent::status(message, "completed", true)).await;
        Ok(())
    }

    async fn outlet(&self, _body: &mut ChatRequest, ctx: &FilterContext) -> Result<(), FilterError> {
        // Only requests that never streamed are still here
        self.clocks().remove(&ctx.request_id);
        Ok(())
    }
}

/// Human-readable duration, rounded to whole seconds:
/// "1 second", "42 seconds", "2 minutes", "1 minute 5 seconds".
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    if total < 60 {
        return plural(total, "second");
    }

    let minutes = plural(total / 60, "minute");
    match total % 60 {
        0 => minutes,
        rest => format!("{minutes} {}", plural(rest, "second")),
    }
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}
