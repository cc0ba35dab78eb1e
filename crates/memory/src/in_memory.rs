//! In-memory store — useful for testing and the CLI driver.

use async_trait::async_trait;
use chatplug_core::error::MemoryError;
use chatplug_core::memory::{MemoryRecord, MemoryStore};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// An in-memory store that keeps every user's memories in one Vec,
/// in insertion order.
pub struct InMemoryStore {
    records: Arc<RwLock<Vec<MemoryRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    /// Start from existing records (e.g. a JSON fixture).
    pub fn with_records(records: Vec<MemoryRecord>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Total number of records across all users.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    fn name(&self) -> &str { "in_memory" }

    async fn get_memories_by_user_id(&self, user_id: &str) -> Result<Vec<MemoryRecord>, MemoryError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_new_memory(
        &self,
        user_id: &str,
        content: &str,
    ) -> Result<Option<MemoryRecord>, MemoryError> {
        let now = Utc::now();
        let record = MemoryRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: Some(now),
        };
        debug!(user = user_id, id = %record.id, "Stored memory");
        self.records.write().await.push(record.clone());
        Ok(Some(record))
    }

    async fn delete_memory_by_id(&self, id: &str) -> Result<bool, MemoryError> {
        let mut records = self.records.write().await;
        let len_before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() < len_before)
    }

    async fn get_memory_by_id(&self, id: &str) -> Result<Option<MemoryRecord>, MemoryError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }
}
