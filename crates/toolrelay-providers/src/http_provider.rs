//! Streaming HTTP provider for OpenAI-compatible APIs.
//!
//! Posts to `/chat/completions` with `stream: true` and turns the
//! Server-Sent Events response into [`StreamFragment`]s.

use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures_util::{future, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::{debug, error, trace, warn};

use toolrelay_core::config::ProviderConfig;
use toolrelay_core::types::{
    ChatCompletionChunk, ChatCompletionRequest, Message, ResponseFormat, StreamFragment,
    ToolDefinition,
};

use crate::error::ProviderError;
use crate::traits::{FragmentStream, LlmProvider, LlmRequestConfig};

/// Used when the config leaves `apiBase` unset.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Longest silence tolerated between two reads of the stream.
const READ_TIMEOUT: Duration = Duration::from_secs(120);

// ─────────────────────────────────────────────
// HttpProvider
// ─────────────────────────────────────────────

/// A streaming LLM provider that talks to any OpenAI-compatible HTTP API.
pub struct HttpProvider {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    /// API base URL (e.g. `"https://api.openai.com/v1"`).
    api_base: String,
    /// API key for Bearer authentication.
    api_key: String,
    /// Default model for this provider instance.
    default_model: String,
    /// Extra headers to send with each request.
    extra_headers: HeaderMap,
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("api_base", &self.api_base)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl HttpProvider {
    /// Create a new HttpProvider.
    ///
    /// # Arguments
    /// * `config` : API key, optional base URL and extra headers
    /// * `model`  : The default model to use
    pub fn new(config: &ProviderConfig, model: &str) -> Result<Self, ProviderError> {
        let api_base = config
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let mut extra_headers = HeaderMap::new();
        if let Some(ref headers) = config.extra_headers {
            for (key, value) in headers {
                if let (Ok(name), Ok(val)) = (
                    HeaderName::from_bytes(key.as_bytes()),
                    HeaderValue::from_str(value),
                ) {
                    extra_headers.insert(name, val);
                } else {
                    warn!("Invalid header: {}={}", key, value);
                }
            }
        }

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .build()?;

        Ok(HttpProvider {
            client,
            api_base,
            api_key: config.api_key.clone(),
            default_model: model.to_string(),
            extra_headers,
        })
    }

    /// Build the full chat completions URL.
    fn completions_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }
}

#[async_trait]
impl LlmProvider for HttpProvider {
    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &str,
        config: &LlmRequestConfig,
    ) -> Result<FragmentStream, ProviderError> {
        debug!(
            model = %model,
            messages = messages.len(),
            tools = tools.len(),
            "Opening LLM stream"
        );

        let has_tools = !tools.is_empty();
        let request_body = ChatCompletionRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            tools: has_tools.then(|| tools.to_vec()),
            tool_choice: has_tools.then(|| "auto".to_string()),
            stream: true,
            max_tokens: Some(config.max_tokens),
            temperature: Some(config.temperature),
            response_format: config.json_mode.then(ResponseFormat::json_object),
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .headers(self.extra_headers.clone())
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                ProviderError::Http(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(status = %status, body = %body, "API error");
            return Err(ProviderError::Status { status, body });
        }

        let stream = response
            .bytes_stream()
            .eventsource()
            .take_while(|event| future::ready(!is_done_marker(event)))
            .filter_map(|event| future::ready(parse_event(event)));

        Ok(Box::pin(stream))
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn display_name(&self) -> &str {
        "OpenAI-compatible"
    }
}

// ─────────────────────────────────────────────
// SSE decoding
// ─────────────────────────────────────────────

fn is_done_marker<E>(event: &Result<Event, E>) -> bool {
    matches!(event, Ok(ev) if ev.data.trim() == "[DONE]")
}

/// Decode one SSE event. `None` means "nothing for the caller" (blank data,
/// choice-less chunk).
fn parse_event(
    event: Result<Event, EventStreamError<reqwest::Error>>,
) -> Option<Result<StreamFragment, ProviderError>> {
    let event = match event {
        Ok(ev) => ev,
        Err(EventStreamError::Transport(e)) => return Some(Err(ProviderError::Http(e))),
        Err(e) => return Some(Err(ProviderError::Stream(e.to_string()))),
    };

    trace!(data = %event.data, "SSE event");
    if event.data.trim().is_empty() {
        return None;
    }

    let value: Value = match serde_json::from_str(&event.data) {
        Ok(v) => v,
        Err(error) => {
            return Some(Err(ProviderError::Decode {
                error,
                data: event.data,
            }))
        }
    };

    if let Some(message) = api_error_message(&value) {
        error!(error = %message, "error object in stream");
        return Some(Err(ProviderError::Api(message)));
    }

    match serde_json::from_value::<ChatCompletionChunk>(value) {
        Ok(chunk) => chunk.into_fragment().map(Ok),
        Err(error) => Some(Err(ProviderError::Decode {
            error,
            data: event.data,
        })),
    }
}

/// Extract the message of an in-stream `{"error": ...}` object.
fn api_error_message(value: &Value) -> Option<String> {
    let error = value.get("error")?;
    if let Some(message) = error.get("message").and_then(Value::as_str) {
        return Some(message.to_string());
    }
    if let Some(message) = error.as_str() {
        return Some(message.to_string());
    }
    Some("An error occurred during streaming".to_string())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
