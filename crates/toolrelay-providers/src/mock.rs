//! Scripted provider for tests and offline runs.
//!
//! Each call to `chat_stream` plays the next queued turn. The message list
//! of every call is recorded so tests can assert on what was replayed.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream;
use toolrelay_core::types::{Message, StreamFragment, ToolDefinition};

use crate::error::ProviderError;
use crate::traits::{FragmentStream, LlmProvider, LlmRequestConfig};

/// One scripted turn: either fragments to stream or an error to fail with
/// before the first fragment.
pub enum ScriptedTurn {
    Fragments(Vec<Result<StreamFragment, ProviderError>>),
    Fail(ProviderError),
}

/// Provider that replays canned turns in order.
pub struct ScriptedProvider {
    turns: Mutex<VecDeque<ScriptedTurn>>,
    requests: Mutex<Vec<Vec<Message>>>,
    model: String,
}

impl ScriptedProvider {
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            requests: Mutex::new(Vec::new()),
            model: "scripted".to_string(),
        }
    }

    /// Convenience for turns that always succeed.
    pub fn from_fragments(turns: Vec<Vec<StreamFragment>>) -> Self {
        Self::new(
            turns
                .into_iter()
                .map(|t| ScriptedTurn::Fragments(t.into_iter().map(Ok).collect()))
                .collect(),
        )
    }

    /// Message lists sent so far, one per call.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of calls made.
    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Turns not yet played.
    pub fn remaining(&self) -> usize {
        self.turns.lock().map(|t| t.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn chat_stream(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
        _model: &str,
        _config: &LlmRequestConfig,
    ) -> Result<FragmentStream, ProviderError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }

        let turn = self
            .turns
            .lock()
            .ok()
            .and_then(|mut turns| turns.pop_front())
            .ok_or(ProviderError::Exhausted)?;

        match turn {
            ScriptedTurn::Fragments(items) => Ok(Box::pin(stream::iter(items))),
            ScriptedTurn::Fail(err) => Err(err),
        }
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    fn display_name(&self) -> &str {
        "Scripted"
    }
}
