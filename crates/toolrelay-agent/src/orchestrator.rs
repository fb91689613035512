//! Stream orchestrator: the streaming LLM ↔ tool-calling loop.
//!
//! One `run` drives one request: open a streaming turn with the full history,
//! forward text deltas as they arrive, execute the tool calls a turn ends
//! with, append the results, and open the next turn. The loop ends on a
//! content-only completion or when the turn budget runs out.

use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{debug, error, info, warn};

use toolrelay_core::config::AgentConfig;
use toolrelay_core::store::ConversationStore;
use toolrelay_core::types::{ConversationRecord, Message, ToolDefinition};
use toolrelay_core::utils::{generate_conversation_id, truncate_string};
use toolrelay_providers::traits::{LlmProvider, LlmRequestConfig};

use crate::accumulator::{DeltaAccumulator, TurnOutcome};
use crate::dispatcher::ToolDispatcher;
use crate::error::AgentError;
use crate::events::{AgentEvent, EmitError, EventEmitter};
use crate::tools::ToolRegistry;

/// Result of one turn.
enum TurnStep {
    /// Tool results were appended; open another turn.
    Continue,
    /// Content-only completion with the final text.
    Answer(String),
}

pub struct StreamOrchestrator {
    provider: Arc<dyn LlmProvider>,
    dispatcher: ToolDispatcher,
    store: Arc<dyn ConversationStore>,
    model: String,
    system_prompt: String,
    max_iterations: u32,
    request_config: LlmRequestConfig,
}

impl StreamOrchestrator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        store: Arc<dyn ConversationStore>,
        config: &AgentConfig,
    ) -> Self {
        let model = if config.model.is_empty() {
            provider.default_model().to_string()
        } else {
            config.model.clone()
        };

        Self {
            provider,
            dispatcher: ToolDispatcher::new(tools),
            store,
            model,
            system_prompt: config.system_prompt.clone(),
            max_iterations: config.max_tool_iterations,
            request_config: LlmRequestConfig {
                max_tokens: config.max_tokens,
                temperature: config.temperature,
                json_mode: config.json_mode,
            },
        }
    }

    /// The store finished records are written to.
    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Names of the tools advertised to the model.
    pub fn tool_names(&self) -> Vec<String> {
        self.dispatcher
            .definitions()
            .into_iter()
            .map(|d| d.function.name)
            .collect()
    }

    /// Drive one request to completion.
    ///
    /// On success the record is stored, then `done` and the end marker are
    /// emitted. On failure (including a failed store write) an `error` unit
    /// and the end marker are emitted instead. A cancelled request emits and
    /// stores nothing.
    pub async fn run(
        &self,
        message: String,
        conversation_id: Option<String>,
        emitter: EventEmitter,
    ) -> Result<Arc<ConversationRecord>, AgentError> {
        let id = conversation_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(generate_conversation_id);
        info!(
            conversation_id = %id,
            model = %self.model,
            message = %truncate_string(&message, 80),
            "request started"
        );

        let record = match self.drive(&id, message, &emitter).await {
            Ok(record) => record,
            Err(e) => return Err(self.fail(&id, e, emitter).await),
        };
        info!(
            conversation_id = %record.id,
            messages = record.messages.len(),
            tool_calls = record.tool_calls.len(),
            "conversation complete"
        );
        if let Ok(pretty) = serde_json::to_string_pretty(record.as_ref()) {
            debug!("full response:\n{pretty}");
        }

        // the record must be retrievable before `done` goes out
        if let Err(e) = self.store.put(Arc::clone(&record)).await {
            return Err(self.fail(&id, AgentError::Store(e), emitter).await);
        }

        let done = AgentEvent::Done {
            conversation_id: id.clone(),
            full_response: Arc::clone(&record),
        };
        match emitter.emit(&done).await {
            Ok(()) => {
                let _ = emitter.finish().await;
                Ok(record)
            }
            Err(EmitError::Closed) => Ok(record),
            Err(e) => Err(self.fail(&id, e.into(), emitter).await),
        }
    }

    /// Report a request-fatal error to the client, unless it is already gone.
    async fn fail(&self, id: &str, e: AgentError, emitter: EventEmitter) -> AgentError {
        if let AgentError::Cancelled = e {
            info!(conversation_id = %id, "client disconnected, request aborted");
            return e;
        }
        error!(conversation_id = %id, error = %e, "request failed");
        let event = AgentEvent::Error {
            error: e.to_string(),
        };
        if emitter.emit(&event).await.is_ok() {
            let _ = emitter.finish().await;
        }
        e
    }

    async fn drive(
        &self,
        id: &str,
        message: String,
        emitter: &EventEmitter,
    ) -> Result<Arc<ConversationRecord>, AgentError> {
        let mut record = ConversationRecord::new(id);
        let mut messages = vec![
            Message::system(self.system_prompt.clone()),
            Message::user(message),
        ];
        let tools = self.dispatcher.definitions();

        let mut remaining = self.max_iterations;
        loop {
            match self
                .turn(&mut messages, &mut record, &tools, remaining, emitter)
                .await?
            {
                TurnStep::Continue => remaining -= 1,
                TurnStep::Answer(answer) => return Ok(record.complete(messages, answer)),
            }
        }
    }

    /// One upstream turn with `remaining` turns left in the budget.
    async fn turn(
        &self,
        messages: &mut Vec<Message>,
        record: &mut ConversationRecord,
        tools: &[ToolDefinition],
        remaining: u32,
        emitter: &EventEmitter,
    ) -> Result<TurnStep, AgentError> {
        if remaining == 0 {
            warn!(
                conversation_id = %record.id,
                limit = self.max_iterations,
                "tool iteration budget exhausted"
            );
            return Err(AgentError::IterationLimit {
                limit: self.max_iterations,
            });
        }
        let turn = self.max_iterations - remaining + 1;
        debug!(
            conversation_id = %record.id,
            turn,
            remaining,
            messages = messages.len(),
            "opening turn"
        );

        let mut stream = tokio::select! {
            biased;
            _ = emitter.closed() => return Err(AgentError::Cancelled),
            opened = self.provider.chat_stream(
                messages.as_slice(),
                tools,
                &self.model,
                &self.request_config,
            ) => opened?,
        };

        let mut acc = DeltaAccumulator::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = emitter.closed() => return Err(AgentError::Cancelled),
                next = stream.next() => next,
            };
            let Some(fragment) = next else { break };

            if let Some(delta) = acc.push(fragment?) {
                let event = AgentEvent::Content {
                    content: delta,
                    accumulated: acc.text().to_string(),
                };
                emitter.emit(&event).await?;
            }
            if acc.tool_calls_ready() {
                debug!(
                    conversation_id = %record.id,
                    turn,
                    calls = acc.pending_calls(),
                    "tool calls signalled"
                );
                break;
            }
        }
        drop(stream);

        match acc.finish() {
            TurnOutcome::Content(text) => {
                debug!(
                    conversation_id = %record.id,
                    turn,
                    chars = text.len(),
                    "content completion"
                );
                messages.push(Message::assistant(text.clone()));
                Ok(TurnStep::Answer(text))
            }
            TurnOutcome::ToolCalls(calls) => {
                info!(
                    conversation_id = %record.id,
                    turn,
                    calls = calls.len(),
                    "tool calls requested"
                );
                messages.push(Message::assistant_tool_calls(calls.clone()));
                record.tool_calls.extend(calls.iter().cloned());

                for call in &calls {
                    if call.function.name.is_empty() {
                        warn!(
                            conversation_id = %record.id,
                            call_id = %call.id,
                            "skipping tool call without a name"
                        );
                        continue;
                    }
                    let invocation = self.dispatcher.dispatch(call, emitter).await?;
                    messages.push(Message::tool_result(
                        call.id.clone(),
                        invocation.result.to_content(),
                    ));
                }
                Ok(TurnStep::Continue)
            }
        }
    }
}
