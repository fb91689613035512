//! Provider errors.

use thiserror::Error;

/// Everything that can go wrong talking to the upstream streaming API.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Connection, TLS, or body read failure.
    #[error("Error calling LLM: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("Error calling LLM: {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The SSE framing broke mid-stream.
    #[error("Stream error: {0}")]
    Stream(String),

    /// The upstream sent an `error` object inside the stream.
    #[error("Upstream API error: {0}")]
    Api(String),

    /// A chunk was not valid JSON for the chunk schema.
    #[error("Failed to decode stream chunk: {error}, data: {data}")]
    Decode {
        error: serde_json::Error,
        data: String,
    },

    /// Scripted provider has nothing left to play.
    #[error("No scripted turn left")]
    Exhausted,
}
