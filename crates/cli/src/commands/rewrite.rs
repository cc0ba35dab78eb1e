//! `chatplug rewrite` — apply a rewrite strategy to raw text.

use chatplug_config::AppConfig;
use chatplug_core::Result;
use chatplug_core::filter::RewriteStrategy;
use chatplug_filters::rewrite;
use std::path::Path;
use tracing::debug;

use super::read_input;

pub fn run(
    config: &AppConfig,
    file: Option<&Path>,
    strategy: Option<RewriteStrategy>,
) -> Result<()> {
    let strategy = strategy.unwrap_or(config.tool_call_format.strategy);
    let input = read_input(file)?;
    debug!(%strategy, bytes = input.len(), "Rewriting input");

    println!("{}", rewrite(&input, strategy));
    Ok(())
}
