//! `chatplug filter` — run the configured filter chain over a request body.

use chatplug_config::AppConfig;
use chatplug_core::filter::FilterContext;
use chatplug_core::{Error, Result};
use chatplug_core::memory::MemoryRecord;
use chatplug_core::message::{ChatRequest, RequestId, UserInfo};
use chatplug_filters::default_chain;
use chatplug_memory::InMemoryStore;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::read_input;
use crate::Stage;
use crate::emitter::StderrEmitter;

/// One memory in a `--memories` file. Timestamps are Unix seconds.
#[derive(Debug, Deserialize)]
struct SeedMemory {
    content: String,
    #[serde(default)]
    created_at: Option<i64>,
    #[serde(default)]
    updated_at: Option<i64>,
}

/// Turn seed entries into records owned by `user_id`.
///
/// Entries without `created_at` keep their file order after every dated one.
fn seed_records(user_id: &str, seeds: Vec<SeedMemory>) -> Result<Vec<MemoryRecord>> {
    let now = Utc::now();
    seeds
        .into_iter()
        .enumerate()
        .map(|(i, seed)| {
            let created_at = match seed.created_at {
                Some(secs) => timestamp(secs)?,
                None => now,
            };
            let updated_at = seed.updated_at.map(timestamp).transpose()?;
            Ok(MemoryRecord {
                id: format!("seed-{}", i + 1),
                user_id: user_id.to_string(),
                content: seed.content,
                created_at,
                updated_at: updated_at.or(Some(created_at)),
            })
        })
        .collect()
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| Error::InvalidInput(format!("Timestamp out of range: {secs}")))
}

pub async fn run(
    config: &AppConfig,
    stage: Stage,
    file: Option<&Path>,
    user: Option<String>,
    memories: Option<&Path>,
) -> Result<()> {
    let mut body: ChatRequest = serde_json::from_str(&read_input(file)?)?;

    let records = match (memories, user.as_deref()) {
        (Some(path), Some(user_id)) => {
            let seeds: Vec<SeedMemory> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            seed_records(user_id, seeds)?
        }
        (Some(_), None) => return Err(Error::InvalidInput("--memories needs --user".into())),
        _ => Vec::new(),
    };
    info!(memories = records.len(), "Seeded memory store");

    let chain = default_chain(config, Arc::new(InMemoryStore::with_records(records)));
    let ctx = FilterContext::new(
        RequestId::new(),
        user.map(UserInfo::new),
        Arc::new(StderrEmitter),
    );

    match stage {
        Stage::Inlet => chain.inlet(&mut body, &ctx).await?,
        Stage::Outlet => chain.outlet(&mut body, &ctx).await?,
    }

    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
