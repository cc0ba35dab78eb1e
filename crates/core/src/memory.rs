//! Memory store trait: the host-owned, per-user memory bank.
//!
//! The host persists memories; plugins only read and edit them through
//! this interface. The method set matches the host's data-access layer:
//! list by user, insert, delete by id, get by id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::MemoryError;

/// A single stored memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique ID for this memory
    pub id: String,

    /// Owner of the memory
    pub user_id: String,

    /// The remembered fact
    pub content: String,

    /// When this memory was created (Unix seconds on the wire)
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,

    /// When this memory was last changed (Unix seconds on the wire)
    #[serde(with = "chrono::serde::ts_seconds_option", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The core MemoryStore trait.
///
/// Implementations: in-memory (tests, CLI), none (no-op).
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// The store name (e.g., "in_memory", "none").
    fn name(&self) -> &str;

    /// All memories owned by `user_id`, in storage order.
    async fn get_memories_by_user_id(
        &self,
        user_id: &str,
    ) -> std::result::Result<Vec<MemoryRecord>, MemoryError>;

    /// Insert a memory. `None` means the store declined the insert.
    async fn insert_new_memory(
        &self,
        user_id: &str,
        content: &str,
    ) -> std::result::Result<Option<MemoryRecord>, MemoryError>;

    /// Delete a memory by ID. Returns whether anything was removed.
    async fn delete_memory_by_id(&self, id: &str) -> std::result::Result<bool, MemoryError>;

    /// Get a memory by ID.
    async fn get_memory_by_id(
        &self,
        id: &str,
    ) -> std::result::Result<Option<MemoryRecord>, MemoryError>;
}

/// Render a user's memory bank as a numbered list, oldest first.
pub fn numbered_listing(memories: &[MemoryRecord]) -> String {
    let mut sorted: Vec<&MemoryRecord> = memories.iter().collect();
    sorted.sort_by_key(|m| m.created_at);
    sorted
        .iter()
        .enumerate()
        .map(|(i, m)| format!("{}. {}", i + 1, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}
