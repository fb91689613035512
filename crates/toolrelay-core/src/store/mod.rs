//! Conversation store: where finished `ConversationRecord`s live.
//!
//! The agent only sees the [`ConversationStore`] trait; whether records sit in
//! a process-local map or somewhere else is the caller's choice.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::types::ConversationRecord;

pub use memory::InMemoryConversationStore;

/// Keyed storage for finished conversations.
///
/// Implementations must accept concurrent `put`s for distinct ids without
/// callers coordinating among themselves.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Store a finished record under its id, replacing any previous record
    /// with the same id.
    async fn put(&self, record: Arc<ConversationRecord>) -> anyhow::Result<()>;

    /// Look up a record. `Ok(None)` means "not found".
    async fn get(&self, id: &str) -> anyhow::Result<Option<Arc<ConversationRecord>>>;

    /// Whether records survive a process restart.
    fn is_persistent(&self) -> bool;
}
