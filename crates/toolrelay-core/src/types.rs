//! Core types for Toolrelay: the OpenAI chat completions wire format plus the
//! records the agent keeps about a conversation.
//!
//! Requests and conversation history use typed enums so a malformed message
//! sequence is a compile error, not an upstream 400.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─────────────────────────────────────────────
// Messages (OpenAI chat completions format)
// ─────────────────────────────────────────────

/// A chat message in the OpenAI format.
///
/// Each variant maps to a `role` field value. Order in a `Vec<Message>` is
/// conversation turn order and is replayed verbatim to the upstream model.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role")]
pub enum Message {
    #[serde(rename = "system")]
    System { content: String },

    #[serde(rename = "user")]
    User { content: String },

    /// `content` is `null` exactly when `tool_calls` is present.
    #[serde(rename = "assistant")]
    Assistant {
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<ToolCall>>,
    },

    #[serde(rename = "tool")]
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    /// Create an assistant message with text content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: Some(content.into()),
            tool_calls: None,
        }
    }

    /// Create an assistant message carrying tool calls (content is null).
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Message::Assistant {
            content: None,
            tool_calls: Some(tool_calls),
        }
    }

    /// Create a tool result message answering `tool_call_id`.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }

    /// The `role` string of this message.
    pub fn role(&self) -> &'static str {
        match self {
            Message::System { .. } => "system",
            Message::User { .. } => "user",
            Message::Assistant { .. } => "assistant",
            Message::Tool { .. } => "tool",
        }
    }
}

// ─────────────────────────────────────────────
// Tool Calls (function calling)
// ─────────────────────────────────────────────

/// A finalized tool call issued by the assistant.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Opaque id assigned by the upstream; tool results answer it.
    pub id: String,
    /// Always "function" in current OpenAI API.
    #[serde(rename = "type")]
    pub call_type: String,
    /// The function to call.
    pub function: FunctionCall,
}

impl ToolCall {
    /// Create a new tool call.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        ToolCall {
            id: id.into(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// The function name and raw arguments within a tool call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    /// Name of the function/tool to call.
    pub name: String,
    /// JSON-encoded arguments string, exactly as streamed.
    pub arguments: String,
}

// ─────────────────────────────────────────────
// Tool Definitions (for LLM requests)
// ─────────────────────────────────────────────

/// Definition of a tool, sent to the LLM so it knows what tools are available.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    /// Always "function".
    #[serde(rename = "type")]
    pub tool_type: String,
    /// The function schema.
    pub function: FunctionDefinition,
}

/// Schema of a function tool.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a new tool definition.
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

// ─────────────────────────────────────────────
// Tool results
// ─────────────────────────────────────────────

/// Outcome of one tool invocation, as seen by the model.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolResult {
    /// Structured payload returned by the tool.
    Success(Value),
    /// Human-readable description of what went wrong.
    Failure(String),
}

impl ToolResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success(_))
    }

    /// JSON form: the payload itself, or `{"error": "..."}`.
    pub fn to_value(&self) -> Value {
        match self {
            ToolResult::Success(payload) => payload.clone(),
            ToolResult::Failure(message) => serde_json::json!({ "error": message }),
        }
    }

    /// Serialized text used as the content of a `tool` message.
    pub fn to_content(&self) -> String {
        self.to_value().to_string()
    }
}

// ─────────────────────────────────────────────
// Streaming (chat.completion.chunk)
// ─────────────────────────────────────────────

/// One `data:` payload of a streaming chat completion.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

/// A single choice within a streamed chunk.
#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    pub finish_reason: Option<String>,
}

/// Incremental content of a streamed choice.
#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<WireToolCallDelta>>,
}

/// A partial tool call as it appears on the wire.
#[derive(Debug, Deserialize)]
pub struct WireToolCallDelta {
    pub index: Option<usize>,
    pub id: Option<String>,
    pub function: Option<WireFunctionDelta>,
}

#[derive(Debug, Deserialize)]
pub struct WireFunctionDelta {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

/// Why a streaming turn ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FinishReason {
    /// Plain completion.
    Stop,
    /// The model wants tool calls executed.
    ToolCalls,
    /// Output token limit reached.
    Length,
    Other(String),
}

impl From<&str> for FinishReason {
    fn from(reason: &str) -> Self {
        match reason {
            "stop" => FinishReason::Stop,
            "tool_calls" => FinishReason::ToolCalls,
            "length" => FinishReason::Length,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

/// A partial tool call carried by one fragment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ToolCallDelta {
    /// Position of the call within the turn (absent means 0).
    pub index: Option<usize>,
    pub id: Option<String>,
    pub name: Option<String>,
    /// Argument substring to append.
    pub arguments: Option<String>,
}

impl ToolCallDelta {
    /// Delta opening a call: carries the id and name.
    pub fn start(index: usize, id: impl Into<String>, name: impl Into<String>) -> Self {
        ToolCallDelta {
            index: Some(index),
            id: Some(id.into()),
            name: Some(name.into()),
            arguments: None,
        }
    }

    /// Delta appending an argument substring.
    pub fn args(index: usize, arguments: impl Into<String>) -> Self {
        ToolCallDelta {
            index: Some(index),
            arguments: Some(arguments.into()),
            ..Default::default()
        }
    }
}

/// One provider-neutral unit of a streaming turn.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StreamFragment {
    /// Text to append to the turn's content.
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallDelta>,
    /// Terminal signal, if this fragment ends the turn.
    pub finish_reason: Option<FinishReason>,
}

impl StreamFragment {
    /// Fragment carrying only text.
    pub fn text(content: impl Into<String>) -> Self {
        StreamFragment {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Fragment carrying only tool-call deltas.
    pub fn tool_calls(deltas: Vec<ToolCallDelta>) -> Self {
        StreamFragment {
            tool_calls: deltas,
            ..Default::default()
        }
    }

    /// Fragment carrying only a terminal signal.
    pub fn finish(reason: FinishReason) -> Self {
        StreamFragment {
            finish_reason: Some(reason),
            ..Default::default()
        }
    }
}

impl ChatCompletionChunk {
    /// Convert the first choice into a fragment. `None` for choice-less
    /// chunks (usage reports, keep-alives).
    pub fn into_fragment(self) -> Option<StreamFragment> {
        let choice = self.choices.into_iter().next()?;
        let tool_calls = choice
            .delta
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                let (name, arguments) = match tc.function {
                    Some(f) => (f.name, f.arguments),
                    None => (None, None),
                };
                ToolCallDelta {
                    index: tc.index,
                    id: tc.id,
                    name,
                    arguments,
                }
            })
            .collect();

        Some(StreamFragment {
            content: choice.delta.content,
            tool_calls,
            finish_reason: choice.finish_reason.as_deref().map(FinishReason::from),
        })
    }
}

// ─────────────────────────────────────────────
// Chat completion request (for building API calls)
// ─────────────────────────────────────────────

/// Request body for a streaming OpenAI-compatible chat completion.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

/// `response_format` request field.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        ResponseFormat {
            format_type: "json_object".to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Conversation record
// ─────────────────────────────────────────────

/// The complete log of one top-level request, stored once the loop ends.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    pub id: String,
    /// Full message sequence, seed included.
    pub messages: Vec<Message>,
    /// Every tool call the model issued, in finalize order.
    pub tool_calls: Vec<ToolCall>,
    pub final_answer: Option<String>,
    /// `final_answer` parsed as JSON, when it is valid JSON.
    pub parsed_json: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationRecord {
    /// Start an empty record for `id`, stamped now.
    pub fn new(id: impl Into<String>) -> Self {
        ConversationRecord {
            id: id.into(),
            messages: Vec::new(),
            tool_calls: Vec::new(),
            final_answer: None,
            parsed_json: None,
            timestamp: Utc::now(),
        }
    }

    /// Fill in the final answer and its parsed form, freezing the record.
    pub fn complete(mut self, messages: Vec<Message>, final_answer: String) -> Arc<Self> {
        self.parsed_json = serde_json::from_str(&final_answer).ok();
        self.final_answer = Some(final_answer);
        self.messages = messages;
        Arc::new(self)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_system_and_user_serialization() {
        let messages = vec![Message::system("Be helpful."), Message::user("Hi")];
        let json = serde_json::to_value(messages).unwrap();
        assert_eq!(json[0]["role"], "system");
        assert_eq!(json[0]["content"], "Be helpful.");
        assert_eq!(json[1]["role"], "user");
        assert_eq!(json[1]["content"], "Hi");
    }

    #[test]
    fn test_assistant_text_message_serialization() {
        let json = serde_json::to_value(Message::assistant("The answer is 4.")).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "The answer is 4.");
        assert!(json.get("tool_calls").is_none());
    }

    #[test]
    fn test_assistant_tool_calls_has_null_content() {
        let msg = Message::assistant_tool_calls(vec![ToolCall::new(
            "call_1",
            "calculate",
            r#"{"expression":"2+2"}"#,
        )]);
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "assistant");
        assert!(json["content"].is_null());
        assert!(json.get("content").is_some());
        let calls = json["tool_calls"].as_array().unwrap();
        assert_eq!(calls[0]["id"], "call_1");
        assert_eq!(calls[0]["type"], "function");
        assert_eq!(calls[0]["function"]["name"], "calculate");
        assert_eq!(calls[0]["function"]["arguments"], r#"{"expression":"2+2"}"#);
    }

    #[test]
    fn test_tool_result_message_serialization() {
        let json = serde_json::to_value(Message::tool_result("call_1", "{\"result\":4}")).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "call_1");
        assert_eq!(json["content"], "{\"result\":4}");
    }

    #[test]
    fn test_message_sequence_replays_verbatim() {
        let messages = vec![
            Message::system("sys"),
            Message::user("what's 2+2"),
            Message::assistant_tool_calls(vec![ToolCall::new("c1", "calculate", "{}")]),
            Message::tool_result("c1", "{}"),
            Message::assistant("4"),
        ];
        let text = serde_json::to_string(&messages).unwrap();
        let back: Vec<Message> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, messages);
        let roles: Vec<&str> = back.iter().map(Message::role).collect();
        assert_eq!(roles, ["system", "user", "assistant", "tool", "assistant"]);
    }

    #[test]
    fn test_tool_result_forms() {
        let ok = ToolResult::Success(json!({"expression": "2+2", "result": 4}));
        assert!(ok.is_success());
        assert_eq!(ok.to_value()["result"], 4);
        assert_eq!(ok.to_content(), r#"{"expression":"2+2","result":4}"#);

        let err = ToolResult::Failure("Unknown tool: nope".into());
        assert!(!err.is_success());
        assert_eq!(err.to_value(), json!({"error": "Unknown tool: nope"}));
        let reparsed: Value = serde_json::from_str(&err.to_content()).unwrap();
        assert_eq!(reparsed["error"], "Unknown tool: nope");
    }

    #[test]
    fn test_chunk_with_content_to_fragment() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "choices": [{"index": 0, "delta": {"content": "Hel"}, "finish_reason": null}]
        }))
        .unwrap();

        let fragment = chunk.into_fragment().unwrap();
        assert_eq!(fragment.content.as_deref(), Some("Hel"));
        assert!(fragment.tool_calls.is_empty());
        assert!(fragment.finish_reason.is_none());
    }

    #[test]
    fn test_chunk_with_tool_call_delta_to_fragment() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "choices": [{
                "index": 0,
                "delta": {
                    "tool_calls": [{
                        "index": 1,
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "get_weather", "arguments": "{\"loc"}
                    }]
                },
                "finish_reason": null
            }]
        }))
        .unwrap();

        let fragment = chunk.into_fragment().unwrap();
        assert_eq!(
            fragment.tool_calls,
            vec![ToolCallDelta {
                index: Some(1),
                id: Some("call_9".into()),
                name: Some("get_weather".into()),
                arguments: Some("{\"loc".into()),
            }]
        );
    }

    #[test]
    fn test_chunk_finish_reason_mapping() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "choices": [{"index": 0, "delta": {}, "finish_reason": "tool_calls"}]
        }))
        .unwrap();
        let fragment = chunk.into_fragment().unwrap();
        assert_eq!(fragment.finish_reason, Some(FinishReason::ToolCalls));

        assert_eq!(FinishReason::from("stop"), FinishReason::Stop);
        assert_eq!(FinishReason::from("length"), FinishReason::Length);
        assert_eq!(
            FinishReason::from("content_filter"),
            FinishReason::Other("content_filter".into())
        );
    }

    #[test]
    fn test_chunk_without_choices_is_skipped() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "choices": [],
            "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
        }))
        .unwrap();
        assert!(chunk.into_fragment().is_none());
    }

    #[test]
    fn test_streaming_request_serialization() {
        let request = ChatCompletionRequest {
            model: "gpt-4o".into(),
            messages: vec![Message::user("hi")],
            tools: None,
            tool_choice: None,
            stream: true,
            max_tokens: Some(4096),
            temperature: None,
            response_format: Some(ResponseFormat::json_object()),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], true);
        assert_eq!(json["response_format"]["type"], "json_object");
        assert!(json.get("tools").is_none());
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_record_complete_parses_json_answer() {
        let record = ConversationRecord::new("conv_1")
            .complete(vec![Message::user("q")], r#"{"answer": 4}"#.to_string());
        assert_eq!(record.final_answer.as_deref(), Some(r#"{"answer": 4}"#));
        assert_eq!(record.parsed_json, Some(json!({"answer": 4})));
    }

    #[test]
    fn test_record_complete_plain_text_answer() {
        let record = ConversationRecord::new("conv_2").complete(Vec::new(), "four".to_string());
        assert!(record.parsed_json.is_none());

        let json = serde_json::to_value(record.as_ref()).unwrap();
        assert_eq!(json["id"], "conv_2");
        assert_eq!(json["finalAnswer"], "four");
        assert!(json["parsedJson"].is_null());
        assert!(json["toolCalls"].as_array().unwrap().is_empty());
        assert!(json["timestamp"].is_string());
    }
}
