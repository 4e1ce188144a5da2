//! Runs the tool calls left pending by the last model turn
//!
//! The calling agent names the sequence it is working in. The news agent's
//! `queries` sub-conversation is answered there; everything else is
//! answered in `messages`.

use super::ToolContext;
use crate::conversation::{ConversationState, StateUpdate, ToolCall, Turn};
use crate::runtime::{RuntimeError, ToolExecutor};

/// Which sequence a batch of tool calls belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChannel {
    Messages,
    Queries,
}

impl ToolChannel {
    pub fn turns(self, state: &ConversationState) -> &[Turn] {
        match self {
            ToolChannel::Messages => &state.messages,
            ToolChannel::Queries => &state.queries,
        }
    }

    fn pending_calls(self, state: &ConversationState) -> &[ToolCall] {
        self.turns(state)
            .last()
            .map_or(&[][..], Turn::pending_tool_calls)
    }

    fn append(self, results: Vec<Turn>) -> StateUpdate {
        match self {
            ToolChannel::Messages => StateUpdate::default().append_messages(results),
            ToolChannel::Queries => StateUpdate::default().append_queries(results),
        }
    }
}

/// Execute every pending call and return the tool-result turns as an update.
///
/// Fails on the first unknown or failing tool; nothing is returned for the
/// calls that already ran.
pub async fn run_pending_tools(
    state: &ConversationState,
    channel: ToolChannel,
    tools: &dyn ToolExecutor,
    ctx: &ToolContext,
) -> Result<StateUpdate, RuntimeError> {
    let calls = channel.pending_calls(state);
    if calls.is_empty() {
        tracing::debug!(thread_id = %ctx.thread_id, channel = ?channel, "No pending tool calls");
        return Ok(StateUpdate::default());
    }

    let mut results = Vec::with_capacity(calls.len());
    for call in calls {
        let value = tools
            .execute(&call.name, call.args.clone(), ctx.clone())
            .await
            .ok_or_else(|| RuntimeError::UnknownTool(call.name.clone()))?
            .map_err(|source| RuntimeError::Tool {
                name: call.name.clone(),
                source,
            })?;
        results.push(Turn::tool_result(call.id.clone(), value.into_content()));
    }

    tracing::info!(
        thread_id = %ctx.thread_id,
        channel = ?channel,
        results = results.len(),
        "Tool calls completed"
    );

    Ok(channel.append(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::MockToolExecutor;
    use crate::tools::{ToolError, ToolValue};
    use serde_json::json;

    fn ctx() -> ToolContext {
        ToolContext::new("thread-1", "/tmp")
    }

    fn search_call(id: &str) -> ToolCall {
        ToolCall::new(id, "search_internet", json!({"query": "rust"}))
    }

    #[tokio::test]
    async fn test_message_calls_answered_in_messages() {
        let tools = MockToolExecutor::new()
            .with_tool("search_internet", ToolValue::Text("found it".into()));
        let state = ConversationState {
            messages: vec![
                Turn::user("news?"),
                Turn::assistant_with_calls("", vec![search_call("c1"), search_call("c2")]),
            ],
            ..Default::default()
        };

        let update = run_pending_tools(&state, ToolChannel::Messages, &tools, &ctx())
            .await
            .unwrap();
        assert!(update.queries.is_empty());
        assert_eq!(
            update.messages.append,
            vec![
                Turn::tool_result("c1", "found it"),
                Turn::tool_result("c2", "found it"),
            ]
        );
        assert_eq!(tools.recorded_executions().len(), 2);
    }

    #[tokio::test]
    async fn test_query_channel_answers_queries() {
        let tools = MockToolExecutor::new().with_tool(
            "search_internet",
            ToolValue::Structured(json!([{"title": "t"}])),
        );
        let state = ConversationState {
            messages: vec![
                Turn::user("summarize"),
                Turn::assistant_with_calls("", vec![search_call("old")]),
            ],
            queries: vec![
                Turn::user("summarize"),
                Turn::assistant_with_calls("", vec![search_call("q1")]),
            ],
            ..Default::default()
        };

        let update = run_pending_tools(&state, ToolChannel::Queries, &tools, &ctx())
            .await
            .unwrap();
        assert!(update.messages.is_empty());
        assert_eq!(
            update.queries.append,
            vec![Turn::tool_result("q1", "[\n  {\n    \"title\": \"t\"\n  }\n]")]
        );
        assert_eq!(tools.recorded_executions().len(), 1);
    }

    #[tokio::test]
    async fn test_message_channel_ignores_pending_queries() {
        let tools = MockToolExecutor::new()
            .with_tool("search_internet", ToolValue::Text("fresh".into()))
            .with_failing_tool("generate_csv_file", "disk full");
        let state = ConversationState {
            messages: vec![
                Turn::user("headlines"),
                Turn::assistant_with_calls("", vec![search_call("c1")]),
            ],
            queries: vec![
                Turn::user("summarize"),
                Turn::assistant_with_calls(
                    "",
                    vec![ToolCall::new("q1", "generate_csv_file", json!({"rows": []}))],
                ),
            ],
            ..Default::default()
        };

        let update = run_pending_tools(&state, ToolChannel::Messages, &tools, &ctx())
            .await
            .unwrap();
        assert!(update.queries.is_empty());
        assert_eq!(update.messages.append, vec![Turn::tool_result("c1", "fresh")]);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_error() {
        let tools = MockToolExecutor::new();
        let state = ConversationState {
            messages: vec![Turn::assistant_with_calls("", vec![search_call("c1")])],
            ..Default::default()
        };

        let err = run_pending_tools(&state, ToolChannel::Messages, &tools, &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::UnknownTool(name) if name == "search_internet"));
    }

    #[tokio::test]
    async fn test_tool_failure_propagates() {
        let tools = MockToolExecutor::new()
            .with_tool("search_internet", ToolValue::Text("ok".into()))
            .with_failing_tool("generate_pdf_file", "renderer missing");
        let state = ConversationState {
            messages: vec![Turn::assistant_with_calls(
                "",
                vec![
                    search_call("c1"),
                    ToolCall::new("c2", "generate_pdf_file", json!({"template": "<p/>"})),
                ],
            )],
            ..Default::default()
        };

        let err = run_pending_tools(&state, ToolChannel::Messages, &tools, &ctx())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Tool { ref name, source: ToolError::Failed(_) } if name == "generate_pdf_file"
        ));
    }

    #[tokio::test]
    async fn test_nothing_pending_is_empty_update() {
        let tools = MockToolExecutor::new();
        let state = ConversationState {
            messages: vec![Turn::user("hi"), Turn::assistant("hello")],
            ..Default::default()
        };
        let update = run_pending_tools(&state, ToolChannel::Messages, &tools, &ctx())
            .await
            .unwrap();
        assert!(update.is_empty());
    }
}
