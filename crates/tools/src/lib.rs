//! Model-invocable tools for chatplug.
//!
//! - [`WebSearchTool`] queries a SearXNG instance and cites each hit.
//! - [`AddMemoryTool`], [`UpdateMemoryTool`] and [`ForgetMemoryTool`]
//!   edit the user's memory bank.

pub mod remember;
pub mod web_search;

use chatplug_config::AppConfig;
use chatplug_core::error::ToolError;
use chatplug_core::memory::MemoryStore;
use chatplug_core::tool::ToolRegistry;
use std::sync::Arc;

pub use remember::{AddMemoryTool, ForgetMemoryTool, UpdateMemoryTool};
pub use web_search::WebSearchTool;

/// Create a tool registry with every built-in tool.
///
/// The memory tools share `store`. Fails only if the HTTP client for
/// web search cannot be built.
pub fn default_registry(
    config: &AppConfig,
    store: Arc<dyn MemoryStore>,
) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(WebSearchTool::new(config.lookup.clone())?));
    registry.register(Box::new(AddMemoryTool::new(store.clone(), &config.remember)));
    registry.register(Box::new(UpdateMemoryTool::new(store.clone(), &config.remember)));
    registry.register(Box::new(ForgetMemoryTool::new(store, &config.remember)));
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatplug_memory::NoopStore;

    #[test]
    fn default_registry_has_all_tools() {
        let registry = default_registry(&AppConfig::default(), Arc::new(NoopStore)).unwrap();
        assert_eq!(
            registry.names(),
            vec!["add_memory", "forget_memory", "update_memory", "web_search"]
        );
    }
}
