//! In-memory conversation store (non-persistent).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::ConversationStore;
use crate::types::ConversationRecord;

/// Process-local map of conversation id → record.
///
/// Records are shared as `Arc`s and never mutated once inserted.
#[derive(Clone, Default)]
pub struct InMemoryConversationStore {
    records: Arc<RwLock<HashMap<String, Arc<ConversationRecord>>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored conversations.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn put(&self, record: Arc<ConversationRecord>) -> anyhow::Result<()> {
        let id = record.id.clone();
        let replaced = self.records.write().await.insert(id.clone(), record);
        debug!(conversation_id = %id, replaced = replaced.is_some(), "stored conversation");
        Ok(())
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<Arc<ConversationRecord>>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    fn is_persistent(&self) -> bool {
        false
    }
}
