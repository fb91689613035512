//! Outbound event stream.
//!
//! Observations are serialized to one JSON unit each and pushed into a
//! bounded channel in the order they happen. The HTTP layer (or the CLI)
//! drains the receiving side.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use toolrelay_core::types::ConversationRecord;

/// Channel capacity used by the server and the CLI.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Text of the end-of-stream marker.
pub const END_MARKER: &str = "[DONE]";

/// One observation of a running request.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A non-empty text delta and the turn's running text.
    Content { content: String, accumulated: String },

    /// A dispatched tool call. `arguments` is the raw string when it did not parse.
    ToolCall {
        tool: String,
        arguments: Value,
        result: Value,
    },

    Error { error: String },

    Done {
        #[serde(rename = "conversationId")]
        conversation_id: String,
        #[serde(rename = "fullResponse", serialize_with = "serialize_record")]
        full_response: Arc<ConversationRecord>,
    },
}

fn serialize_record<S: Serializer>(
    record: &Arc<ConversationRecord>,
    s: S,
) -> Result<S::Ok, S::Error> {
    record.as_ref().serialize(s)
}

/// A unit on the wire: serialized event data or the end marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamUnit {
    Data(String),
    End,
}

impl StreamUnit {
    /// The `data:` payload for this unit.
    pub fn as_str(&self) -> &str {
        match self {
            StreamUnit::Data(data) => data,
            StreamUnit::End => END_MARKER,
        }
    }
}

#[derive(Debug, Error)]
pub enum EmitError {
    /// The receiving side is gone; nothing more will be delivered.
    #[error("Output channel closed")]
    Closed,

    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Writer half of a request's outbound stream.
///
/// After the first failed send every further emit is a no-op returning
/// [`EmitError::Closed`].
#[derive(Debug)]
pub struct EventEmitter {
    tx: mpsc::Sender<StreamUnit>,
    closed: AtomicBool,
}

/// Create an emitter and the receiver that drains it.
pub fn channel(capacity: usize) -> (EventEmitter, mpsc::Receiver<StreamUnit>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventEmitter::new(tx), rx)
}

impl EventEmitter {
    pub fn new(tx: mpsc::Sender<StreamUnit>) -> Self {
        Self {
            tx,
            closed: AtomicBool::new(false),
        }
    }

    /// Serialize and send one event.
    pub async fn emit(&self, event: &AgentEvent) -> Result<(), EmitError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EmitError::Closed);
        }
        let data = serde_json::to_string(event)?;
        self.send(StreamUnit::Data(data)).await
    }

    /// Write the end marker and release the channel.
    pub async fn finish(self) -> Result<(), EmitError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EmitError::Closed);
        }
        self.send(StreamUnit::End).await
    }

    async fn send(&self, unit: StreamUnit) -> Result<(), EmitError> {
        if self.tx.send(unit).await.is_err() {
            self.closed.store(true, Ordering::Release);
            debug!("outbound channel closed");
            return Err(EmitError::Closed);
        }
        Ok(())
    }

    /// Whether the receiving side has gone away.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.tx.is_closed()
    }

    /// Resolves once the receiving side is dropped.
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolrelay_core::types::Message;

    #[test]
    fn test_content_event_shape() {
        let event = AgentEvent::Content {
            content: "lo".into(),
            accumulated: "Hello".into(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "content", "content": "lo", "accumulated": "Hello"})
        );
    }

    #[test]
    fn test_tool_call_and_error_shapes() {
        let event = AgentEvent::ToolCall {
            tool: "calculate".into(),
            arguments: json!({"expression": "2+2"}),
            result: json!({"expression": "2+2", "result": 4}),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "tool_call");
        assert_eq!(json["tool"], "calculate");
        assert_eq!(json["result"]["result"], 4);

        let event = AgentEvent::Error { error: "boom".into() };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "error", "error": "boom"})
        );
    }

    #[test]
    fn test_done_event_shape() {
        let record =
            ConversationRecord::new("conv_1").complete(vec![Message::user("hi")], "4".into());
        let event = AgentEvent::Done {
            conversation_id: "conv_1".into(),
            full_response: record,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "done");
        assert_eq!(json["conversationId"], "conv_1");
        assert_eq!(json["fullResponse"]["finalAnswer"], "4");
        assert_eq!(json["fullResponse"]["parsedJson"], 4);
    }

    #[tokio::test]
    async fn test_units_arrive_in_order_then_end() {
        let (emitter, mut rx) = channel(8);
        emitter.emit(&AgentEvent::Error { error: "a".into() }).await.unwrap();
        emitter
            .emit(&AgentEvent::Content { content: "b".into(), accumulated: "b".into() })
            .await
            .unwrap();
        emitter.finish().await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.as_str(), r#"{"type":"error","error":"a"}"#);
        let second = rx.recv().await.unwrap();
        assert!(second.as_str().starts_with(r#"{"type":"content""#));
        assert_eq!(rx.recv().await, Some(StreamUnit::End));
        // sender released
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_emit_after_receiver_dropped() {
        let (emitter, rx) = channel(8);
        drop(rx);
        assert!(emitter.is_closed());
        emitter.closed().await;

        let event = AgentEvent::Error { error: "x".into() };
        assert!(matches!(emitter.emit(&event).await, Err(EmitError::Closed)));
        assert!(matches!(emitter.emit(&event).await, Err(EmitError::Closed)));
        assert!(matches!(emitter.finish().await, Err(EmitError::Closed)));
    }

    #[test]
    fn test_end_marker_text() {
        assert_eq!(StreamUnit::End.as_str(), "[DONE]");
        assert_eq!(StreamUnit::Data("{}".into()).as_str(), "{}");
    }
}
