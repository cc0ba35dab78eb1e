//! Filter trait — hooks the host runs around every model call.
//!
//! The host drives each request through `inlet` (before the model sees
//! the body), `stream` (once per streamed chunk) and `outlet` (after the
//! response is complete). Filters mutate the payload in place.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use crate::error::FilterError;
use crate::event::{EventEmitter, HostEvent, NoopEmitter};
use crate::message::{ChatRequest, RequestId, StreamEvent, UserInfo};

/// How the tool-call formatter treats each tool-call block it finds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteStrategy {
    /// Remove the block entirely
    Strip,
    /// Replace the block with a one-line "used tool" note
    #[default]
    Summarize,
    /// Keep the block, adding an advisory attribute to its opening tag
    Annotate,
}

impl std::str::FromStr for RewriteStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strip" => Ok(Self::Strip),
            "summarize" => Ok(Self::Summarize),
            "annotate" => Ok(Self::Annotate),
            other => Err(format!(
                "unknown rewrite strategy '{other}' (expected strip, summarize or annotate)"
            )),
        }
    }
}

impl std::fmt::Display for RewriteStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Strip => "strip",
            Self::Summarize => "summarize",
            Self::Annotate => "annotate",
        };
        f.write_str(name)
    }
}

/// Per-request context supplied by the host to every hook.
#[derive(Clone)]
pub struct FilterContext {
    /// Identifies one inlet → stream → outlet sequence
    pub request_id: RequestId,

    /// The user the request belongs to
    pub user: Option<UserInfo>,

    /// Where status events go
    pub emitter: Arc<dyn EventEmitter>,
}

impl FilterContext {
    pub fn new(request_id: RequestId, user: Option<UserInfo>, emitter: Arc<dyn EventEmitter>) -> Self {
        Self {
            request_id,
            user,
            emitter,
        }
    }

    /// A fresh request with no user and no event sink.
    pub fn detached() -> Self {
        Self::new(RequestId::new(), None, Arc::new(NoopEmitter))
    }

    /// The user's id, if the host supplied a non-empty one.
    pub fn user_id(&self) -> Option<&str> {
        self.user
            .as_ref()
            .map(|u| u.id.as_str())
            .filter(|id| !id.is_empty())
    }

    pub async fn emit(&self, event: HostEvent) {
        self.emitter.emit(event).await;
    }
}

/// The core Filter trait. Every hook defaults to pass-through.
#[async_trait]
pub trait Filter: Send + Sync {
    /// The unique name of this filter.
    fn name(&self) -> &str;

    /// Runs on the request body before it reaches the model.
    async fn inlet(&self, _body: &mut ChatRequest, _ctx: &FilterContext) -> Result<(), FilterError> {
        Ok(())
    }

    /// Runs on each streamed chunk.
    async fn stream(&self, _event: &mut StreamEvent, _ctx: &FilterContext) -> Result<(), FilterError> {
        Ok(())
    }

    /// Runs on the completed body after the model has answered.
    async fn outlet(&self, _body: &mut ChatRequest, _ctx: &FilterContext) -> Result<(), FilterError> {
        Ok(())
    }
}

/// Filters applied in registration order.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter to the end of the chain.
    pub fn register(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }

    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub async fn inlet(&self, body: &mut ChatRequest, ctx: &FilterContext) -> Result<(), FilterError> {
        for filter in &self.filters {
            debug!(filter = filter.name(), request = %ctx.request_id, "inlet");
            filter.inlet(body, ctx).await?;
        }
        Ok(())
    }

    pub async fn stream(&self, event: &mut StreamEvent, ctx: &FilterContext) -> Result<(), FilterError> {
        for filter in &self.filters {
            filter.stream(event, ctx).await?;
        }
        Ok(())
    }

    pub async fn outlet(&self, body: &mut ChatRequest, ctx: &FilterContext) -> Result<(), FilterError> {
        for filter in &self.filters {
            debug!(filter = filter.name(), request = %ctx.request_id, "outlet");
            filter.outlet(body, ctx).await?;
        }
        Ok(())
    }
}
