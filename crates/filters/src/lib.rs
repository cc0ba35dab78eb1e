//! Request/response filters for chatplug.
//!
//! - [`ToolCallFormatFilter`] rewrites native tool-call markup on outlet
//!   using the [`rewriter`] engine.
//! - [`MemoryInjectionFilter`] adds the user's memories to the system
//!   prompt on inlet.
//! - [`ReasoningTimerFilter`] reports how long the model took to produce
//!   its first chunk.

pub mod memory_injection;
pub mod reasoning_timer;
pub mod rewriter;
pub mod tool_call_format;

use chatplug_config::AppConfig;
use chatplug_core::filter::FilterChain;
use chatplug_core::memory::MemoryStore;
use std::sync::Arc;

pub use memory_injection::MemoryInjectionFilter;
pub use reasoning_timer::{ReasoningTimerFilter, format_duration};
pub use rewriter::{rewrite, rewrite_message};
pub use tool_call_format::ToolCallFormatFilter;

/// Build the standard chain: memory injection, reasoning timer,
/// tool-call formatting.
pub fn default_chain(config: &AppConfig, store: Arc<dyn MemoryStore>) -> FilterChain {
    let mut chain = FilterChain::new();
    chain.register(Box::new(MemoryInjectionFilter::new(
        store,
        config.memory_injection.clone(),
    )));
    chain.register(Box::new(ReasoningTimerFilter::new(config.reasoning.clone())));
    chain.register(Box::new(ToolCallFormatFilter::from_config(
        &config.tool_call_format,
    )));
    chain
}
