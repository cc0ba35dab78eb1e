//! chatplug CLI — drive the plugins locally.
//!
//! Commands:
//! - `rewrite` — Rewrite tool-call markup in a piece of text
//! - `filter`  — Run the filter chain over a request body
//! - `search`  — Run the web search tool
//! - `config`  — Show the effective configuration

use chatplug_config::AppConfig;
use chatplug_core::filter::RewriteStrategy;
use chatplug_core::{Error, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

mod commands;
mod emitter;

#[derive(Parser)]
#[command(
    name = "chatplug",
    about = "chatplug — local driver for the chat plugin collection",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.chatplug/config.toml)
    #[arg(short, long, global = true, env = "CHATPLUG_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite tool-call blocks in FILE (or stdin) and print the result
    Rewrite {
        file: Option<PathBuf>,

        /// strip, summarize or annotate (defaults to the configured strategy)
        #[arg(short, long)]
        strategy: Option<RewriteStrategy>,
    },

    /// Run the filter chain over a JSON request body from FILE (or stdin)
    Filter {
        #[arg(value_enum)]
        stage: Stage,

        file: Option<PathBuf>,

        /// User id the request is made for
        #[arg(short, long)]
        user: Option<String>,

        /// JSON file with the user's memories: [{"content": ..., "created_at": ...}]
        #[arg(short, long)]
        memories: Option<PathBuf>,
    },

    /// Search the web through the configured SearXNG instance
    Search {
        #[arg(required = true)]
        queries: Vec<String>,

        /// Results per query
        #[arg(short = 'n', long, default_value_t = 3)]
        results: i64,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Print the config file path instead
        #[arg(long)]
        path: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Stage {
    Inlet,
    Outlet,
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let loaded = match path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    };
    loaded.map_err(|e| Error::Config {
        message: format!("Failed to load config: {e}"),
    })
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Commands::Config { path: true } = cli.command {
        let path = cli
            .config
            .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));
        println!("{}", path.display());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Rewrite { file, strategy } => {
            commands::rewrite::run(&config, file.as_deref(), strategy)?
        }
        Commands::Filter {
            stage,
            file,
            user,
            memories,
        } => {
            commands::filter::run(&config, stage, file.as_deref(), user, memories.as_deref())
                .await?
        }
        Commands::Search { queries, results } => {
            commands::search::run(&config, queries, results).await?
        }
        Commands::Config { .. } => commands::config_cmd::show(&config)?,
    }

    Ok(())
}
