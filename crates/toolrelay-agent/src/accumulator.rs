//! Per-turn reconstruction of streamed text and tool calls.
//!
//! Fragments carry partial tool calls keyed by a small index. Each index gets
//! one builder; the builders are frozen into [`ToolCall`]s when the turn ends
//! with a tool-calls signal.

use std::collections::BTreeMap;

use toolrelay_core::types::{FinishReason, StreamFragment, ToolCall, ToolCallDelta};

/// How a turn ended.
#[derive(Clone, Debug, PartialEq)]
pub enum TurnOutcome {
    /// The model asked for these calls, in index order.
    ToolCalls(Vec<ToolCall>),
    /// Plain completion with the accumulated text.
    Content(String),
}

#[derive(Debug, Default)]
struct CallBuilder {
    id: String,
    name: String,
    arguments: String,
}

/// Consumes the fragments of one streaming turn.
#[derive(Debug, Default)]
pub struct DeltaAccumulator {
    text: String,
    calls: BTreeMap<usize, CallBuilder>,
    tool_calls_signalled: bool,
}

impl DeltaAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of distinct call indices seen.
    pub fn pending_calls(&self) -> usize {
        self.calls.len()
    }

    /// Feed one fragment.
    ///
    /// Returns the non-empty text delta it carried, if any. Tool-call deltas
    /// are merged after the text so content is always observed first.
    pub fn push(&mut self, fragment: StreamFragment) -> Option<String> {
        let delta = fragment.content.filter(|c| !c.is_empty());
        if let Some(ref text) = delta {
            self.text.push_str(text);
        }

        for call in fragment.tool_calls {
            self.merge(call);
        }

        if fragment.finish_reason == Some(FinishReason::ToolCalls) {
            self.tool_calls_signalled = true;
        }

        delta
    }

    fn merge(&mut self, delta: ToolCallDelta) {
        let builder = self.calls.entry(delta.index.unwrap_or(0)).or_default();

        if builder.id.is_empty() {
            if let Some(id) = delta.id.filter(|id| !id.is_empty()) {
                builder.id = id;
            }
        }
        if let Some(name) = delta.name.filter(|n| !n.is_empty()) {
            builder.name = name;
        }
        if let Some(arguments) = delta.arguments {
            builder.arguments.push_str(&arguments);
        }
    }

    /// True once a tool-calls terminal signal arrived with at least one call.
    pub fn tool_calls_ready(&self) -> bool {
        self.tool_calls_signalled && !self.calls.is_empty()
    }

    /// Freeze the turn.
    ///
    /// A tool-calls signal with nothing accumulated, or calls without the
    /// signal, fall through to a content completion.
    pub fn finish(self) -> TurnOutcome {
        if self.tool_calls_ready() {
            let calls = self
                .calls
                .into_values()
                .map(|b| ToolCall::new(b.id, b.name, b.arguments))
                .collect();
            TurnOutcome::ToolCalls(calls)
        } else {
            TurnOutcome::Content(self.text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(
        index: Option<usize>,
        id: Option<&str>,
        name: Option<&str>,
        args: Option<&str>,
    ) -> ToolCallDelta {
        ToolCallDelta {
            index,
            id: id.map(String::from),
            name: name.map(String::from),
            arguments: args.map(String::from),
        }
    }

    #[test]
    fn test_text_only_turn() {
        let mut acc = DeltaAccumulator::new();
        assert_eq!(acc.push(StreamFragment::text("Hel")).as_deref(), Some("Hel"));
        assert_eq!(acc.push(StreamFragment::text("")), None);
        assert_eq!(acc.push(StreamFragment::text("lo")).as_deref(), Some("lo"));
        acc.push(StreamFragment::finish(FinishReason::Stop));
        assert_eq!(acc.text(), "Hello");
        assert_eq!(acc.finish(), TurnOutcome::Content("Hello".into()));
    }

    #[test]
    fn test_arguments_concatenate_in_arrival_order() {
        let mut acc = DeltaAccumulator::new();
        acc.push(StreamFragment::tool_calls(vec![ToolCallDelta::start(0, "call_a", "calculate")]));
        acc.push(StreamFragment::tool_calls(vec![ToolCallDelta::start(
            1,
            "call_b",
            "get_weather",
        )]));
        for piece in ["{\"expr", "ession\":", "\"2+2\"}"] {
            acc.push(StreamFragment::tool_calls(vec![ToolCallDelta::args(0, piece)]));
        }
        // interleaved second index
        acc.push(StreamFragment::tool_calls(vec![
            ToolCallDelta::args(1, "{\"location\":"),
            ToolCallDelta::args(0, ""),
        ]));
        acc.push(StreamFragment::tool_calls(vec![ToolCallDelta::args(1, "\"Paris\"}")]));
        acc.push(StreamFragment::finish(FinishReason::ToolCalls));

        match acc.finish() {
            TurnOutcome::ToolCalls(calls) => {
                assert_eq!(calls.len(), 2);
                assert_eq!(
                    calls[0],
                    ToolCall::new("call_a", "calculate", "{\"expression\":\"2+2\"}")
                );
                assert_eq!(
                    calls[1],
                    ToolCall::new("call_b", "get_weather", "{\"location\":\"Paris\"}")
                );
            }
            other => panic!("expected tool calls, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_index_defaults_to_zero() {
        let mut acc = DeltaAccumulator::new();
        acc.push(StreamFragment::tool_calls(vec![delta(
            None,
            Some("c1"),
            Some("calculate"),
            Some("{}"),
        )]));
        acc.push(StreamFragment::tool_calls(vec![delta(Some(0), None, None, Some(" "))]));
        acc.push(StreamFragment::finish(FinishReason::ToolCalls));
        assert_eq!(acc.pending_calls(), 1);
        assert_eq!(
            acc.finish(),
            TurnOutcome::ToolCalls(vec![ToolCall::new("c1", "calculate", "{} ")])
        );
    }

    #[test]
    fn test_last_non_empty_name_wins_and_first_id_sticks() {
        let mut acc = DeltaAccumulator::new();
        acc.push(StreamFragment::tool_calls(vec![delta(
            Some(0),
            Some("first"),
            Some("calc"),
            None,
        )]));
        acc.push(StreamFragment::tool_calls(vec![delta(Some(0), Some("second"), Some(""), None)]));
        acc.push(StreamFragment::tool_calls(vec![delta(Some(0), None, Some("calculate"), None)]));
        acc.push(StreamFragment::finish(FinishReason::ToolCalls));
        assert_eq!(
            acc.finish(),
            TurnOutcome::ToolCalls(vec![ToolCall::new("first", "calculate", "")])
        );
    }

    #[test]
    fn test_out_of_order_indices_are_finalized_by_index() {
        let mut acc = DeltaAccumulator::new();
        acc.push(StreamFragment::tool_calls(vec![ToolCallDelta::start(2, "c2", "b")]));
        acc.push(StreamFragment::tool_calls(vec![ToolCallDelta::start(0, "c0", "a")]));
        acc.push(StreamFragment::finish(FinishReason::ToolCalls));
        match acc.finish() {
            TurnOutcome::ToolCalls(calls) => {
                let ids: Vec<&str> = calls.iter().map(|c| c.id.as_str()).collect();
                assert_eq!(ids, ["c0", "c2"]);
            }
            other => panic!("expected tool calls, got {other:?}"),
        }
    }

    #[test]
    fn test_tool_signal_without_calls_falls_through_to_content() {
        let mut acc = DeltaAccumulator::new();
        acc.push(StreamFragment::text("{\"a\":1}"));
        acc.push(StreamFragment::finish(FinishReason::ToolCalls));
        assert!(!acc.tool_calls_ready());
        assert_eq!(acc.finish(), TurnOutcome::Content("{\"a\":1}".into()));
    }

    #[test]
    fn test_calls_without_signal_fall_through_to_content() {
        let mut acc = DeltaAccumulator::new();
        acc.push(StreamFragment::tool_calls(vec![ToolCallDelta::start(0, "c", "calculate")]));
        acc.push(StreamFragment::finish(FinishReason::Stop));
        assert_eq!(acc.finish(), TurnOutcome::Content(String::new()));
    }

    #[test]
    fn test_content_and_tool_delta_in_one_fragment() {
        let mut acc = DeltaAccumulator::new();
        let fragment = StreamFragment {
            content: Some("Let me check. ".into()),
            tool_calls: vec![ToolCallDelta::start(0, "c", "get_weather")],
            finish_reason: Some(FinishReason::ToolCalls),
        };
        assert_eq!(acc.push(fragment).as_deref(), Some("Let me check. "));
        assert!(acc.tool_calls_ready());
    }
}
