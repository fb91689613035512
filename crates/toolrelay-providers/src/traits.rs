//! LLM Provider trait : the streaming chat boundary.
//!
//! The `HttpProvider` in `http_provider.rs` covers OpenAI-compatible APIs;
//! `ScriptedProvider` in `mock.rs` replays canned turns.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use toolrelay_core::types::{Message, StreamFragment, ToolDefinition};

use crate::error::ProviderError;

/// The fragments of one streaming turn, in arrival order.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<StreamFragment, ProviderError>> + Send>>;

/// Configuration passed to each LLM call.
#[derive(Clone, Debug)]
pub struct LlmRequestConfig {
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// Request a JSON object response.
    pub json_mode: bool,
}

impl Default for LlmRequestConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.7,
            json_mode: false,
        }
    }
}

/// Trait that all LLM providers must implement.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Open one streaming turn.
    ///
    /// # Arguments
    /// * `messages` : Full conversation history in OpenAI format.
    /// * `tools`    : Tool definitions the model may call.
    /// * `model`    : Model identifier (e.g. `"gpt-4o"`).
    /// * `config`   : Temperature, max_tokens, JSON mode.
    ///
    /// # Returns
    /// A stream of fragments. Errors that happen before the first byte are
    /// returned directly; later ones arrive as `Err` items.
    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &str,
        config: &LlmRequestConfig,
    ) -> Result<FragmentStream, ProviderError>;

    /// The default model for this provider instance.
    fn default_model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}
