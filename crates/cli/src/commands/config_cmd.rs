//! `chatplug config` — show the effective configuration.

use chatplug_config::AppConfig;
use chatplug_core::{Error, Result};

pub fn show(config: &AppConfig) -> Result<()> {
    let toml = config.to_toml().map_err(|e| Error::Config {
        message: e.to_string(),
    })?;
    println!("{toml}");
    Ok(())
}
