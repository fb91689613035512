//! Agent errors.

use thiserror::Error;
use toolrelay_providers::ProviderError;

use crate::events::EmitError;

/// Request-fatal failures of the orchestrator. Tool faults never show up
/// here; they become tool results.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The tool-turn budget ran out before a content completion.
    #[error("Maximum tool call iterations reached")]
    IterationLimit { limit: u32 },

    /// Transport or stream failure talking to the model.
    #[error(transparent)]
    Upstream(#[from] ProviderError),

    /// The finished record could not be written to the store.
    #[error("Failed to store conversation: {0}")]
    Store(anyhow::Error),

    /// An event could not be serialized for the outbound stream.
    #[error("Failed to encode event: {0}")]
    Encode(serde_json::Error),

    /// The outbound channel closed; the client is gone.
    #[error("Client disconnected")]
    Cancelled,
}

impl From<EmitError> for AgentError {
    fn from(e: EmitError) -> Self {
        match e {
            EmitError::Closed => AgentError::Cancelled,
            EmitError::Encode(e) => AgentError::Encode(e),
        }
    }
}
