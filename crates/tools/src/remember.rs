//! Memory editing tools: `add_memory`, `update_memory`, `forget_memory`.
//!
//! The model uses these to keep the user's memory bank current. Every
//! successful change sends the updated bank to the host as a citation;
//! the model only sees it when `include_memory_list` is set.

use async_trait::async_trait;
use chatplug_config::RememberConfig;
use chatplug_core::error::{MemoryError, ToolError};
use chatplug_core::event::HostEvent;
use chatplug_core::memory::{MemoryStore, numbered_listing};
use chatplug_core::tool::{Tool, ToolContext, ToolResult};
use std::sync::Arc;
use tracing::{debug, warn};

const NO_USER: &str = "Error: User ID not provided.";

/// Store handle and reporting settings shared by the three tools.
#[derive(Clone)]
struct MemoryBank {
    store: Arc<dyn MemoryStore>,
    include_memory_list: bool,
}

impl MemoryBank {
    fn new(store: Arc<dyn MemoryStore>, config: &RememberConfig) -> Self {
        Self {
            store,
            include_memory_list: config.include_memory_list,
        }
    }

    /// Emit the post-change citation and build the model-facing output.
    async fn report(
        &self,
        ctx: &ToolContext,
        user_id: &str,
        headline: &str,
        terse: &str,
    ) -> Result<ToolResult, MemoryError> {
        let memories = self.store.get_memories_by_user_id(user_id).await?;
        let listing = numbered_listing(&memories);

        ctx.emit(HostEvent::citation(
            format!("{headline}\n---\nUpdated memory bank: \n{listing}"),
            "Remember",
            "🧠 Remember",
            None,
        ))
        .await;

        Ok(if self.include_memory_list {
            ToolResult::ok(format!("{headline}\nUpdated memory bank: \n{listing}"))
        } else {
            ToolResult::ok(terse)
        })
    }
}

fn required_str<'a>(arguments: &'a serde_json::Value, key: &str) -> Result<&'a str, ToolError> {
    arguments[key]
        .as_str()
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

/// Store failures are reported to the model, not raised to the host.
fn store_failure(tool: &str, err: MemoryError) -> ToolResult {
    warn!(tool, error = %err, "Memory store call failed");
    ToolResult::failed(format!("Memory store error: {err}"))
}

pub struct AddMemoryTool {
    bank: MemoryBank,
}

impl AddMemoryTool {
    pub fn new(store: Arc<dyn MemoryStore>, config: &RememberConfig) -> Self {
        Self {
            bank: MemoryBank::new(store, config),
        }
    }

    async fn add(&self, ctx: &ToolContext, user_id: &str, content: &str) -> Result<ToolResult, MemoryError> {
        let Some(record) = self.bank.store.insert_new_memory(user_id, content).await? else {
            return Ok(ToolResult::failed("Failed to add new memory."));
        };
        debug!(user = user_id, id = %record.id, "Added memory");

        self.bank
            .report(ctx, user_id, &format!("Added new memory - {content} "), "Success")
            .await
    }
}

#[async_trait]
impl Tool for AddMemoryTool {
    fn name(&self) -> &str {
        "add_memory"
    }

    fn description(&self) -> &str {
        "Add a new memory to the user's memory bank. Check for related memories first; \
         if one exists, update it with the new information instead of adding a new memory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "The fact to remember about the user"
                }
            },
            "required": ["content"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let Some(user_id) = ctx.user_id() else {
            return Ok(ToolResult::failed(NO_USER));
        };
        let content = required_str(&arguments, "content")?;

        Ok(self
            .add(ctx, user_id, content)
            .await
            .unwrap_or_else(|e| store_failure(self.name(), e)))
    }
}

pub struct UpdateMemoryTool {
    bank: MemoryBank,
}

impl UpdateMemoryTool {
    pub fn new(store: Arc<dyn MemoryStore>, config: &RememberConfig) -> Self {
        Self {
            bank: MemoryBank::new(store, config),
        }
    }

    async fn update(
        &self,
        ctx: &ToolContext,
        user_id: &str,
        old_content: &str,
        new_content: &str,
    ) -> Result<ToolResult, MemoryError> {
        let store = &self.bank.store;
        let memories = store.get_memories_by_user_id(user_id).await?;
        if memories.is_empty() {
            return Ok(ToolResult::failed("No memories found for this user."));
        }

        let Some(target) = memories.iter().find(|m| m.content == old_content) else {
            return Ok(ToolResult::failed(format!(
                "Error: Memory with content '{old_content}' not found."
            )));
        };

        if !store.delete_memory_by_id(&target.id).await? {
            return Ok(ToolResult::failed(format!(
                "Failed to update memory. Could not delete the old memory with content: '{old_content}'."
            )));
        }

        if store.insert_new_memory(user_id, new_content).await?.is_none() {
            warn!(user = user_id, "Old memory deleted but replacement was not stored");
            return Ok(ToolResult::failed(format!(
                "Failed to update memory. Deleted old memory '{old_content}', but failed to add new memory '{new_content}'."
            )));
        }

        debug!(user = user_id, replaced = %target.id, "Updated memory");
        self.bank
            .report(
                ctx,
                user_id,
                &format!("Updated memory: Replaced '{old_content}' with '{new_content}'."),
                "Successfully updated memory.",
            )
            .await
    }
}

#[async_trait]
impl Tool for UpdateMemoryTool {
    fn name(&self) -> &str {
        "update_memory"
    }

    fn description(&self) -> &str {
        "Update an existing memory: find the memory whose text is exactly 'old_content' \
         and replace it with 'new_content'. If several match, only the first is updated."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "new_content": {
                    "type": "string",
                    "description": "The replacement text"
                },
                "old_content": {
                    "type": "string",
                    "description": "The exact text of the memory to replace"
                }
            },
            "required": ["new_content", "old_content"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let Some(user_id) = ctx.user_id() else {
            return Ok(ToolResult::failed(NO_USER));
        };
        let new_content = required_str(&arguments, "new_content")?;
        let old_content = required_str(&arguments, "old_content")?;

        Ok(self
            .update(ctx, user_id, old_content, new_content)
            .await
            .unwrap_or_else(|e| store_failure(self.name(), e)))
    }
}

pub struct ForgetMemoryTool {
    bank: MemoryBank,
}

impl ForgetMemoryTool {
    pub fn new(store: Arc<dyn MemoryStore>, config: &RememberConfig) -> Self {
        Self {
            bank: MemoryBank::new(store, config),
        }
    }

    async fn forget(&self, ctx: &ToolContext, user_id: &str, memory_id: &str) -> Result<ToolResult, MemoryError> {
        let store = &self.bank.store;
        // Someone else's memory is reported exactly like a missing one
        let record = match store.get_memory_by_id(memory_id).await? {
            Some(record) if record.user_id == user_id => record,
            _ => return Ok(ToolResult::failed("Memory not found.")),
        };

        if !store.delete_memory_by_id(memory_id).await? {
            return Ok(ToolResult::failed("Failed to delete memory."));
        }

        debug!(user = user_id, id = memory_id, "Forgot memory");
        self.bank
            .report(ctx, user_id, &format!("Deleted memory - {}", record.content), "Success")
            .await
    }
}

#[async_trait]
impl Tool for ForgetMemoryTool {
    fn name(&self) -> &str {
        "forget_memory"
    }

    fn description(&self) -> &str {
        "Delete a memory from the user's memory bank."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "memory_id": {
                    "type": "string",
                    "description": "ID of the memory to delete"
                }
            },
            "required": ["memory_id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let Some(user_id) = ctx.user_id() else {
            return Ok(ToolResult::failed(NO_USER));
        };
        let memory_id = required_str(&arguments, "memory_id")?;

        Ok(self
            .forget(ctx, user_id, memory_id)
            .await
            .unwrap_or_else(|e| store_failure(self.name(), e)))
    }
}
