//! # chatplug Core
//!
//! Domain types, traits, and error definitions shared by the chatplug
//! filters and tools. This crate defines the contracts of the host
//! runtime the plugins run inside: the request body, the per-user memory
//! store, the event sink, and the filter and tool hooks.
//!
//! Every collaborator is a trait here. Implementations live in their
//! respective crates, so tests can swap in in-memory stand-ins.

pub mod error;
pub mod message;
pub mod filter;
pub mod tool;
pub mod memory;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{ChatRequest, Message, MessageContent, RequestId, Role, StreamEvent, UserInfo};
pub use filter::{Filter, FilterChain, FilterContext, RewriteStrategy};
pub use tool::{Tool, ToolCall, ToolContext, ToolDefinition, ToolRegistry, ToolResult};
pub use memory::{MemoryRecord, MemoryStore};
pub use event::{EventEmitter, HostEvent};
