//! `chatplug search` — run the web search tool from the command line.

use chatplug_config::AppConfig;
use chatplug_core::Result;
use chatplug_core::tool::{Tool, ToolContext};
use chatplug_tools::WebSearchTool;
use std::sync::Arc;

use crate::emitter::StderrEmitter;

pub async fn run(
    config: &AppConfig,
    queries: Vec<String>,
    results: i64,
) -> Result<()> {
    let tool = WebSearchTool::new(config.lookup.clone())?;
    let ctx = ToolContext::new(None, Arc::new(StderrEmitter));

    let result = tool
        .execute(
            serde_json::json!({
                "queries": queries,
                "number_of_results_per_query": results,
            }),
            &ctx,
        )
        .await?;

    println!("{}", result.output);
    Ok(())
}
