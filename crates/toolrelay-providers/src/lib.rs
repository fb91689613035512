//! Streaming LLM provider layer for Toolrelay.
//!
//! # Architecture
//!
//! - [`traits::LlmProvider`]: trait that all providers implement
//! - [`http_provider::HttpProvider`]: OpenAI-compatible SSE client
//! - [`mock::ScriptedProvider`]: replays canned turns (tests, offline runs)
//! - [`error::ProviderError`]: typed upstream failures

pub mod error;
pub mod http_provider;
pub mod mock;
pub mod traits;

// Re-export main types for convenience
pub use error::ProviderError;
pub use http_provider::HttpProvider;
pub use mock::{ScriptedProvider, ScriptedTurn};
pub use traits::{FragmentStream, LlmProvider, LlmRequestConfig};
