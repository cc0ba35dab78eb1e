//! No-op memory store — every user has an empty memory bank.

use async_trait::async_trait;
use chatplug_core::error::MemoryError;
use chatplug_core::memory::{MemoryRecord, MemoryStore};

/// A no-op memory store that stores nothing and refuses inserts.
pub struct NoopStore;

#[async_trait]
impl MemoryStore for NoopStore {
    fn name(&self) -> &str { "none" }

    async fn get_memories_by_user_id(&self, _user_id: &str) -> Result<Vec<MemoryRecord>, MemoryError> {
        Ok(Vec::new())
    }

    async fn insert_new_memory(
        &self,
        _user_id: &str,
        _content: &str,
    ) -> Result<Option<MemoryRecord>, MemoryError> {
        Ok(None)
    }

    async fn delete_memory_by_id(&self, _id: &str) -> Result<bool, MemoryError> {
        Ok(false)
    }

    async fn get_memory_by_id(&self, _id: &str) -> Result<Option<MemoryRecord>, MemoryError> {
        Ok(None)
    }
}
