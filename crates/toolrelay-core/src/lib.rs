//! Toolrelay Core: shared types, configuration, and the conversation store.
//!
//! - **types**: OpenAI wire format, stream fragments, tool results, conversation records
//! - **config**: typed config schema, JSON loader, env var overrides
//! - **store**: `ConversationStore` trait and its in-memory implementation
//! - **utils**: data paths, conversation id generation

pub mod config;
pub mod store;
pub mod types;
pub mod utils;

pub use store::{ConversationStore, InMemoryConversationStore};
pub use types::{ConversationRecord, Message, StreamFragment, ToolCall, ToolDefinition, ToolResult};
