//! Outlet filter that rewrites native tool-call blocks in assistant messages.

use async_trait::async_trait;
use chatplug_config::ToolCallFormatConfig;
use chatplug_core::error::FilterError;
use chatplug_core::filter::{Filter, FilterContext, RewriteStrategy};
use chatplug_core::message::ChatRequest;
use tracing::debug;

use crate::rewriter::rewrite_message;

/// Applies one [`RewriteStrategy`] to every assistant message on outlet,
/// so later turns see a plain note instead of raw tool-call markup.
pub struct ToolCallFormatFilter {
    strategy: RewriteStrategy,
}

impl ToolCallFormatFilter {
    pub fn new(strategy: RewriteStrategy) -> Self {
        Self { strategy }
    }

    pub fn from_config(config: &ToolCallFormatConfig) -> Self {
        Self::new(config.strategy)
    }

    pub fn strategy(&self) -> RewriteStrategy {
        self.strategy
    }
}

impl Default for ToolCallFormatFilter {
    fn default() -> Self {
        Self::new(RewriteStrategy::default())
    }
}

#[async_trait]
impl Filter for ToolCallFormatFilter {
    fn name(&self) -> &str {
        "tool_call_format"
    }

    async fn outlet(&self, body: &mut ChatRequest, ctx: &FilterContext) -> Result<(), FilterError> {
        let rewritten = body
            .messages
            .iter_mut()
            .map(|message| rewrite_message(message, self.strategy))
            .filter(|changed| *changed)
            .count();

        if rewritten > 0 {
            debug!(
                request = %ctx.request_id,
                strategy = %self.strategy,
                messages = rewritten,
                "Rewrote tool-call blocks"
            );
        }
        Ok(())
    }
}
