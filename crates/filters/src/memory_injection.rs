//! Inlet filter that puts the user's stored memories into the system prompt.
//!
//! Runs regardless of whether the host's own memory feature is enabled,
//! so memories can be granted to specific models only.

use async_trait::async_trait;
use chatplug_config::MemoryInjectionConfig;
use chatplug_core::error::FilterError;
use chatplug_core::event::HostEvent;
use chatplug_core::filter::{Filter, FilterContext};
use chatplug_core::memory::{MemoryRecord, MemoryStore};
use chatplug_core::message::{ChatRequest, Message, Role};
use chrono::SecondsFormat;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

pub struct MemoryInjectionFilter {
    store: Arc<dyn MemoryStore>,
    config: MemoryInjectionConfig,
}

/// What the model sees for each memory.
#[derive(Serialize)]
struct InjectedMemory<'a> {
    content: &'a str,
    updated_at: Option<String>,
}

impl MemoryInjectionFilter {
    pub fn new(store: Arc<dyn MemoryStore>, config: MemoryInjectionConfig) -> Self {
        Self { store, config }
    }

    /// The text appended to the system prompt: preamble, newline, JSON list.
    fn injection_text(&self, memories: &[MemoryRecord]) -> Result<String, FilterError> {
        let list: Vec<InjectedMemory<'_>> = memories
            .iter()
            .map(|m| InjectedMemory {
                content: &m.content,
                updated_at: m
                    .updated_at
                    .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
            })
            .collect();

        let json = serde_json::to_string(&list).map_err(|e| FilterError::Failed {
            filter: self.name().to_string(),
            reason: e.to_string(),
        })?;
        Ok(format!("{}\n{json}", self.config.prepending_text))
    }
}

#[async_trait]
impl Filter for MemoryInjectionFilter {
    fn name(&self) -> &str {
        "memory_injection"
    }

    async fn inlet(&self, body: &mut ChatRequest, ctx: &FilterContext) -> Result<(), FilterError> {
        let Some(user_id) = ctx.user_id() else {
            info!(request = %ctx.request_id, "No user id on request; skipping memory injection");
            return Ok(());
        };

        let memories = self.store.get_memories_by_user_id(user_id).await?;

        if self.config.show_memory_count {
            ctx.emit(HostEvent::status(
                format!("Extracted {} memories.", memories.len()),
                "memory_extraction_complete",
                true,
            ))
            .await;
        }

        if memories.is_empty() && !self.config.append_on_empty {
            return Ok(());
        }

        let injection = self.injection_text(&memories)?;

        let existing = body
            .messages
            .iter_mut()
            .filter(|m| m.role == Role::System)
            .find_map(|m| m.content.as_text_mut());

        match existing {
            Some(system) => {
                system.push('\n');
                system.push_str(&injection);
            }
            None => body.messages.insert(0, Message::system(injection)),
        }

        debug!(
            request = %ctx.request_id,
            user = user_id,
            count = memories.len(),
            "Injected memories into system prompt"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatplug_core::error::MemoryError;
    use chatplug_core::event::CollectingEmitter;
    use chatplug_core::message::{RequestId, UserInfo};
    use chatplug_memory::{InMemoryStore, NoopStore};
    use chrono::{TimeZone, Utc};

    fn config() -> MemoryInjectionConfig {
        MemoryInjectionConfig {
            prepending_text: "Memories:".into(),
            ..MemoryInjectionConfig::default()
        }
    }

    fn ctx_for(user: &str, emitter: Arc<CollectingEmitter>) -> FilterContext {
        FilterContext::new(RequestId::from("r1"), Some(UserInfo::new(user)), emitter)
    }

    fn seeded_store() -> Arc<InMemoryStore> {
        Arc::new(InMemoryStore::with_records(vec![MemoryRecord {
            id: "m1".into(),
            user_id: "u1".into(),
            content: "Owns a bike".into(),
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            updated_at: Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
        }]))
    }

    #[tokio::test]
    async fn appends_to_existing_system_message() {
        let filter = MemoryInjectionFilter::new(seeded_store(), config());
        let mut body = ChatRequest::new(vec![Message::system("Be nice."), Message::user("hi")]);

        filter
            .inlet(&mut body, &ctx_for("u1", Arc::new(CollectingEmitter::new())))
            .await
            .unwrap();

        assert_eq!(body.messages.len(), 2);
        assert_eq!(
            body.messages[0].text(),
            Some(
                "Be nice.\nMemories:\n[{\"content\":\"Owns a bike\",\"updated_at\":\"2023-11-14T22:13:20Z\"}]"
            )
        );
        assert_eq!(body.messages[1].text(), Some("hi"));
    }

    #[tokio::test]
    async fn inserts_system_message_when_missing() {
        let filter = MemoryInjectionFilter::new(seeded_store(), config());
        let mut body = ChatRequest::new(vec![Message::user("hi"), Message::assistant("hello")]);

        filter
            .inlet(&mut body, &ctx_for("u1", Arc::new(CollectingEmitter::new())))
            .await
            .unwrap();

        assert_eq!(body.messages.len(), 3);
        assert_eq!(body.messages[0].role, Role::System);
        assert!(body.messages[0].text().unwrap().starts_with("Memories:\n["));
        assert_eq!(body.messages[1].text(), Some("hi"));
        assert_eq!(body.messages[2].text(), Some("hello"));
    }

    #[tokio::test]
    async fn empty_bank_injects_empty_list_by_default() {
        let filter = MemoryInjectionFilter::new(Arc::new(NoopStore), config());
        let mut body = ChatRequest::new(vec![Message::user("hi")]);

        filter
            .inlet(&mut body, &ctx_for("u1", Arc::new(CollectingEmitter::new())))
            .await
            .unwrap();

        assert_eq!(body.messages[0].text(), Some("Memories:\n[]"));
    }

    #[tokio::test]
    async fn empty_bank_skipped_when_disabled() {
        let filter = MemoryInjectionFilter::new(
            Arc::new(NoopStore),
            MemoryInjectionConfig {
                append_on_empty: false,
                ..config()
            },
        );
        let mut body = ChatRequest::new(vec![Message::user("hi")]);
        let before = body.clone();

        filter
            .inlet(&mut body, &ctx_for("u1", Arc::new(CollectingEmitter::new())))
            .await
            .unwrap();
        assert_eq!(body, before);
    }

    #[tokio::test]
    async fn emits_count_when_enabled() {
        let filter = MemoryInjectionFilter::new(
            seeded_store(),
            MemoryInjectionConfig {
                show_memory_count: true,
                ..config()
            },
        );
        let emitter = Arc::new(CollectingEmitter::new());
        let mut body = ChatRequest::new(vec![Message::user("hi")]);

        filter.inlet(&mut body, &ctx_for("u1", emitter.clone())).await.unwrap();

        assert_eq!(
            emitter.events(),
            vec![HostEvent::status(
                "Extracted 1 memories.",
                "memory_extraction_complete",
                true
            )]
        );
    }

    /// A store whose backing database is gone.
    struct UnavailableStore;

    #[async_trait]
    impl MemoryStore for UnavailableStore {
        fn name(&self) -> &str { "unavailable" }
        async fn get_memories_by_user_id(&self, _: &str) -> Result<Vec<MemoryRecord>, MemoryError> {
            Err(MemoryError::Storage("connection refused".into()))
        }
        async fn insert_new_memory(&self, _: &str, _: &str) -> Result<Option<MemoryRecord>, MemoryError> {
            Err(MemoryError::Storage("connection refused".into()))
        }
        async fn delete_memory_by_id(&self, _: &str) -> Result<bool, MemoryError> {
            Err(MemoryError::Storage("connection refused".into()))
        }
        async fn get_memory_by_id(&self, _: &str) -> Result<Option<MemoryRecord>, MemoryError> {
            Err(MemoryError::Storage("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn store_failure_propagates_and_leaves_body_alone() {
        let filter = MemoryInjectionFilter::new(
            Arc::new(UnavailableStore),
            MemoryInjectionConfig {
                show_memory_count: true,
                ..config()
            },
        );
        let emitter = Arc::new(CollectingEmitter::new());
        let mut body = ChatRequest::new(vec![Message::system("S"), Message::user("hi")]);
        let before = body.clone();

        let err = filter
            .inlet(&mut body, &ctx_for("u1", emitter.clone()))
            .await
            .unwrap_err();

        assert!(matches!(err, FilterError::Memory(MemoryError::Storage(_))));
        assert!(err.to_string().contains("connection refused"));
        assert!(emitter.events().is_empty());
        assert_eq!(body, before);
    }

    #[tokio::test]
    async fn no_user_leaves_body_untouched() {
        let filter = MemoryInjectionFilter::new(seeded_store(), config());
        let mut body = ChatRequest::new(vec![Message::user("hi")]);
        let before = body.clone();

        filter.inlet(&mut body, &FilterContext::detached()).await.unwrap();
        assert_eq!(body, before);
    }

    #[tokio::test]
    async fn other_users_memories_are_not_injected() {
        let filter = MemoryInjectionFilter::new(seeded_store(), config());
        let mut body = ChatRequest::new(vec![Message::system("S")]);

        filter
            .inlet(&mut body, &ctx_for("u2", Arc::new(CollectingEmitter::new())))
            .await
            .unwrap();
        assert_eq!(body.messages[0].text(), Some("S\nMemories:\n[]"));
    }
}
