//! Executes finalized tool calls against the registry.
//!
//! Nothing a tool does can fail the request: bad arguments, unknown names,
//! errors and panics all become [`ToolResult::Failure`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::Value;
use tracing::{debug, warn};

use toolrelay_core::types::{ToolCall, ToolDefinition, ToolResult};

use crate::events::{AgentEvent, EmitError, EventEmitter};
use crate::tools::ToolRegistry;

/// What happened when one call was dispatched.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    /// Parsed arguments, or the raw buffer as a string when it did not parse.
    pub arguments: Value,
    pub result: ToolResult,
}

impl ToolInvocation {
    fn event(&self) -> AgentEvent {
        AgentEvent::ToolCall {
            tool: self.name.clone(),
            arguments: self.arguments.clone(),
            result: self.result.to_value(),
        }
    }
}

pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Definitions advertised to the model.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.get_definitions()
    }

    /// Execute `call` and emit its `tool_call` event before returning.
    ///
    /// The only error is a failed emit.
    pub async fn dispatch(
        &self,
        call: &ToolCall,
        emitter: &EventEmitter,
    ) -> Result<ToolInvocation, EmitError> {
        let invocation = self.execute(call).await;
        emitter.emit(&invocation.event()).await?;
        Ok(invocation)
    }

    /// Execute `call` without emitting anything.
    pub async fn execute(&self, call: &ToolCall) -> ToolInvocation {
        let name = call.function.name.clone();
        let raw = call.function.arguments.trim();
        let raw = if raw.is_empty() { "{}" } else { raw };

        let args: Value = match serde_json::from_str(raw) {
            Ok(args) => args,
            Err(e) => {
                warn!(tool = %name, error = %e, "unparseable tool arguments");
                return ToolInvocation {
                    name,
                    arguments: Value::String(call.function.arguments.clone()),
                    result: ToolResult::Failure(format!("Invalid tool arguments: {e}")),
                };
            }
        };

        let Some(tool) = self.registry.get(&name) else {
            warn!(tool = %name, "unknown tool");
            return ToolInvocation {
                result: ToolResult::Failure(format!("Unknown tool: {name}")),
                name,
                arguments: args,
            };
        };

        debug!(tool = %name, call_id = %call.id, "executing tool");
        let result = match AssertUnwindSafe(tool.execute(args.clone())).catch_unwind().await {
            Ok(Ok(payload)) => ToolResult::Success(payload),
            Ok(Err(e)) => {
                warn!(tool = %name, error = %e, "tool execution failed");
                ToolResult::Failure(e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(tool = %name, error = %message, "tool panicked");
                ToolResult::Failure(format!("Tool panicked: {message}"))
            }
        };

        ToolInvocation {
            name,
            arguments: args,
            result,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    use crate::events::channel;
    use crate::tools::{default_registry, Tool};

    struct FailTool;

    #[async_trait]
    impl Tool for FailTool {
        fn name(&self) -> &str {
            "fail"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {}, "required": []})
        }
        async fn execute(&self, _args: Value) -> anyhow::Result<Value> {
            anyhow::bail!("intentional failure")
        }
    }

    struct PanicTool;

    #[async_trait]
    impl Tool for PanicTool {
        fn name(&self) -> &str {
            "panic"
        }
        fn description(&self) -> &str {
            "Always panics"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {}, "required": []})
        }
        async fn execute(&self, _args: Value) -> anyhow::Result<Value> {
            panic!("tool blew up")
        }
    }

    fn dispatcher() -> ToolDispatcher {
        let mut registry = default_registry();
        registry.register(Arc::new(FailTool));
        registry.register(Arc::new(PanicTool));
        ToolDispatcher::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_dispatch_success_emits_event() {
        let (emitter, mut rx) = channel(4);
        let call = ToolCall::new("c1", "calculate", r#"{"expression":"2+2"}"#);

        let inv = dispatcher().dispatch(&call, &emitter).await.unwrap();
        assert_eq!(inv.result, ToolResult::Success(json!({"expression": "2+2", "result": 4})));

        let unit = rx.recv().await.unwrap();
        let event: Value = serde_json::from_str(unit.as_str()).unwrap();
        assert_eq!(event["type"], "tool_call");
        assert_eq!(event["tool"], "calculate");
        assert_eq!(event["arguments"]["expression"], "2+2");
        assert_eq!(event["result"]["result"], 4);
    }

    #[tokio::test]
    async fn test_unparseable_arguments() {
        let call = ToolCall::new("c1", "calculate", r#"{"expression": "2+"#);
        let inv = dispatcher().execute(&call).await;
        assert_eq!(inv.arguments, Value::String(r#"{"expression": "2+"#.into()));
        match &inv.result {
            ToolResult::Failure(msg) => assert!(msg.starts_with("Invalid tool arguments")),
            other => panic!("expected failure, got {other:?}"),
        }
        let content: Value = serde_json::from_str(&inv.result.to_content()).unwrap();
        assert!(content["error"].is_string());
    }

    #[tokio::test]
    async fn test_empty_arguments_are_an_empty_object() {
        let call = ToolCall::new("c1", "fail", "  ");
        let inv = dispatcher().execute(&call).await;
        assert_eq!(inv.arguments, json!({}));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let call = ToolCall::new("c1", "teleport", "{}");
        let inv = dispatcher().execute(&call).await;
        assert_eq!(inv.result, ToolResult::Failure("Unknown tool: teleport".into()));
    }

    #[tokio::test]
    async fn test_tool_error_is_caught() {
        let call = ToolCall::new("c1", "fail", "{}");
        let inv = dispatcher().execute(&call).await;
        assert_eq!(inv.result, ToolResult::Failure("intentional failure".into()));
    }

    #[tokio::test]
    async fn test_tool_panic_is_caught() {
        let call = ToolCall::new("c1", "panic", "{}");
        let inv = dispatcher().execute(&call).await;
        assert_eq!(inv.result, ToolResult::Failure("Tool panicked: tool blew up".into()));
    }

    #[tokio::test]
    async fn test_dispatch_reports_closed_channel() {
        let (emitter, rx) = channel(4);
        drop(rx);
        let call = ToolCall::new("c1", "calculate", r#"{"expression":"1"}"#);
        assert!(matches!(
            dispatcher().dispatch(&call, &emitter).await,
            Err(EmitError::Closed)
        ));
    }
}
