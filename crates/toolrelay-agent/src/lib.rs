//! Toolrelay Agent: the streaming tool-call relay.
//!
//! This crate contains:
//! - **tools**: Tool trait, registry, and the built-in `calculate` / `get_weather` tools
//! - **accumulator**: merges streamed fragments into text and tool calls
//! - **dispatcher**: runs finalized tool calls, absorbing every tool fault
//! - **events**: outbound event units and the channel-backed emitter
//! - **orchestrator**: the turn loop tying the above to an `LlmProvider`

pub mod accumulator;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod tools;

pub use accumulator::{DeltaAccumulator, TurnOutcome};
pub use dispatcher::{ToolDispatcher, ToolInvocation};
pub use error::AgentError;
pub use events::{channel, AgentEvent, EmitError, EventEmitter, StreamUnit};
pub use orchestrator::StreamOrchestrator;
pub use tools::{default_registry, Tool, ToolRegistry};
