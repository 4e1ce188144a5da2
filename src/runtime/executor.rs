//! Graph runtime executor
//!
//! Walks an [`Agent`]'s nodes one at a time, committing every node's update
//! through the checkpointer before consulting the agent's edges. A node may
//! suspend; the runtime then records the pending interrupt and returns to the
//! caller, and a later [`Invocation::Resume`] re-runs that node with the
//! caller's value.

use super::traits::{Agent, Checkpointer, LlmClient, Next, NodeContext, NodeOutput, ToolExecutor};
use crate::conversation::{validate_update, ConversationState, OrphanToolResult, StateUpdate};
use crate::db::{DbError, PendingInterrupt, ThreadRecord, ThreadSummary};
use crate::llm::LlmError;
use crate::routing::RoutingError;
use crate::tools::{ToolContext, ToolError};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Upper bound on nodes run by a single invocation
pub const MAX_GRAPH_STEPS: usize = 25;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),
    #[error("Tool '{name}' failed: {source}")]
    Tool {
        name: String,
        #[source]
        source: ToolError,
    },
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error(transparent)]
    Store(#[from] DbError),
    #[error("Model output does not match {schema}: {message}")]
    StructuredOutput {
        schema: &'static str,
        message: String,
    },
    #[error("Invalid thread state: {0}")]
    InvalidState(String),
    #[error("No pending interrupt to resume")]
    NothingToResume,
    #[error("Graph did not finish within {0} steps")]
    StepLimitExceeded(usize),
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error("Invalid input: {0}")]
    ToolOrdering(#[from] OrphanToolResult),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// How a thread is entered
#[derive(Debug, Clone)]
pub enum Invocation {
    /// Merge caller input into the thread, then run from the entry node
    Start(StateUpdate),
    /// Answer the pending interrupt
    Resume(Value),
}

/// What an invocation ended with
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Completed {
        state: ConversationState,
    },
    AwaitingInput {
        prompt: Value,
        state: ConversationState,
    },
}

#[allow(dead_code)] // Used in tests
impl Outcome {
    pub fn state(&self) -> &ConversationState {
        match self {
            Outcome::Completed { state } | Outcome::AwaitingInput { state, .. } => state,
        }
    }

    pub fn prompt(&self) -> Option<&Value> {
        match self {
            Outcome::Completed { .. } => None,
            Outcome::AwaitingInput { prompt, .. } => Some(prompt),
        }
    }
}

/// Generic graph runtime that can work with any storage, LLM, and tool implementations
pub struct GraphRuntime<S, L, T>
where
    S: Checkpointer,
    L: LlmClient + 'static,
    T: ToolExecutor + 'static,
{
    store: S,
    llm_client: Arc<L>,
    tool_executor: Arc<T>,
    /// Output directory for `ToolContext`
    output_dir: PathBuf,
}

impl<S, L, T> GraphRuntime<S, L, T>
where
    S: Checkpointer,
    L: LlmClient + 'static,
    T: ToolExecutor + 'static,
{
    pub fn new(store: S, llm_client: Arc<L>, tool_executor: Arc<T>, output_dir: PathBuf) -> Self {
        Self {
            store,
            llm_client,
            tool_executor,
            output_dir,
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run an agent on a thread until it ends or suspends
    pub async fn invoke<A: Agent>(
        &self,
        agent: &A,
        thread_id: &str,
        invocation: Invocation,
    ) -> Result<Outcome, RuntimeError> {
        let name = agent.name();

        let (mut state, mut node, mut reply) = match invocation {
            Invocation::Start(input) => {
                if let Some(stale) = self.store.pending(name, thread_id).await? {
                    tracing::warn!(
                        agent = name,
                        thread_id,
                        prompt = %stale.prompt,
                        "Discarding pending interrupt for new invocation"
                    );
                    self.store.set_pending(name, thread_id, None).await?;
                }
                let state = self.store.get_state(name, thread_id).await?;
                let state = if input.is_empty() {
                    state
                } else {
                    validate_update(&state, &input)?;
                    self.store.apply_update(name, thread_id, input).await?
                };
                let entry = agent.entry(&state);
                (state, entry, None)
            }
            Invocation::Resume(value) => {
                let ThreadRecord { state, pending } = self.store.load(name, thread_id).await?;
                let pending = pending.ok_or(RuntimeError::NothingToResume)?;
                let node: A::Node = serde_json::from_value(pending.node)?;
                (state, node, Some(value))
            }
        };

        let ctx = NodeContext {
            thread_id,
            llm: self.llm_client.as_ref(),
            tools: self.tool_executor.as_ref(),
            tool_ctx: ToolContext::new(thread_id, self.output_dir.clone()),
        };

        for step in 0..MAX_GRAPH_STEPS {
            let resumed = reply.is_some();
            tracing::debug!(agent = name, thread_id, node = ?node, step, resumed, "Running node");

            match agent.run_node(node, &state, reply.take(), &ctx).await? {
                NodeOutput::Continue(update) => {
                    if !update.is_empty() {
                        state = self.store.apply_update(name, thread_id, update).await?;
                    }
                    if resumed {
                        self.store.set_pending(name, thread_id, None).await?;
                    }
                    match agent.next(node, &state) {
                        Next::Node(to) => {
                            tracing::debug!(agent = name, thread_id, from = ?node, to = ?to, "Edge");
                            node = to;
                        }
                        Next::End => {
                            tracing::info!(agent = name, thread_id, steps = step + 1, "Invocation completed");
                            return Ok(Outcome::Completed { state });
                        }
                    }
                }
                NodeOutput::Suspend { update, prompt } => {
                    if !update.is_empty() {
                        state = self.store.apply_update(name, thread_id, update).await?;
                    }
                    let pending = PendingInterrupt {
                        node: serde_json::to_value(node)?,
                        prompt: prompt.clone(),
                    };
                    self.store.set_pending(name, thread_id, Some(pending)).await?;
                    tracing::info!(agent = name, thread_id, node = ?node, "Awaiting input");
                    return Ok(Outcome::AwaitingInput { prompt, state });
                }
            }
        }

        tracing::error!(agent = name, thread_id, "Step limit exceeded");
        Err(RuntimeError::StepLimitExceeded(MAX_GRAPH_STEPS))
    }

    pub async fn thread(&self, agent: &str, thread_id: &str) -> Result<ThreadRecord, RuntimeError> {
        Ok(self.store.load(agent, thread_id).await?)
    }

    pub async fn delete_thread(&self, agent: &str, thread_id: &str) -> Result<bool, RuntimeError> {
        let existed = self.store.delete_thread(agent, thread_id).await?;
        tracing::info!(agent, thread_id, existed, "Deleted thread");
        Ok(existed)
    }

    pub async fn list_threads(&self, agent: &str) -> Result<Vec<ThreadSummary>, RuntimeError> {
        Ok(self.store.list_threads(agent).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ToolCall, Turn};
    use crate::runtime::testing::{MockLlmClient, MockToolExecutor};
    use crate::runtime::MemoryCheckpointer;
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;

    /// Asks for a name, greets, ends
    struct Greeter;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    enum GreeterNode {
        Ask,
        Greet,
    }

    #[async_trait]
    impl Agent for Greeter {
        type Node = GreeterNode;

        fn name(&self) -> &'static str {
            "greeter"
        }

        fn entry(&self, _state: &ConversationState) -> GreeterNode {
            GreeterNode::Ask
        }

        async fn run_node(
            &self,
            node: GreeterNode,
            _state: &ConversationState,
            reply: Option<Value>,
            _ctx: &NodeContext<'_>,
        ) -> Result<NodeOutput, RuntimeError> {
            Ok(match (node, reply) {
                (GreeterNode::Ask, None) => NodeOutput::Suspend {
                    update: StateUpdate::default().append_message(Turn::assistant("asking")),
                    prompt: json!("name?"),
                },
                (GreeterNode::Ask, Some(name)) => NodeOutput::Continue(
                    StateUpdate::default().append_message(Turn::user(name.as_str().unwrap_or(""))),
                ),
                (GreeterNode::Greet, _) => {
                    NodeOutput::Continue(StateUpdate::default().append_message(Turn::assistant("hi")))
                }
            })
        }

        fn next(&self, from: GreeterNode, _state: &ConversationState) -> Next<GreeterNode> {
            match from {
                GreeterNode::Ask => Next::Node(GreeterNode::Greet),
                GreeterNode::Greet => Next::End,
            }
        }
    }

    /// Never ends
    struct Looper;

    #[async_trait]
    impl Agent for Looper {
        type Node = u8;

        fn name(&self) -> &'static str {
            "looper"
        }

        fn entry(&self, _state: &ConversationState) -> u8 {
            0
        }

        async fn run_node(
            &self,
            _node: u8,
            _state: &ConversationState,
            _reply: Option<Value>,
            _ctx: &NodeContext<'_>,
        ) -> Result<NodeOutput, RuntimeError> {
            Ok(NodeOutput::Continue(StateUpdate::default()))
        }

        fn next(&self, from: u8, _state: &ConversationState) -> Next<u8> {
            Next::Node(from.wrapping_add(1))
        }
    }

    fn runtime() -> GraphRuntime<MemoryCheckpointer, MockLlmClient, MockToolExecutor> {
        GraphRuntime::new(
            MemoryCheckpointer::new(),
            Arc::new(MockLlmClient::new("mock")),
            Arc::new(MockToolExecutor::new()),
            PathBuf::from("/tmp"),
        )
    }

    #[tokio::test]
    async fn test_suspend_commits_update_and_records_pending() {
        let rt = runtime();
        let outcome = rt
            .invoke(&Greeter, "t1", Invocation::Start(StateUpdate::default()))
            .await
            .unwrap();

        assert_eq!(outcome.prompt(), Some(&json!("name?")));
        assert_eq!(outcome.state().messages, vec![Turn::assistant("asking")]);

        let pending = rt.store().pending("greeter", "t1").await.unwrap().unwrap();
        assert_eq!(pending.node, json!("Ask"));
    }

    #[tokio::test]
    async fn test_resume_continues_and_clears_pending() {
        let rt = runtime();
        rt.invoke(&Greeter, "t1", Invocation::Start(StateUpdate::default()))
            .await
            .unwrap();
        let outcome = rt
            .invoke(&Greeter, "t1", Invocation::Resume(json!("Jane")))
            .await
            .unwrap();

        let Outcome::Completed { state } = outcome else {
            panic!("expected completion");
        };
        assert_eq!(
            state.messages,
            vec![Turn::assistant("asking"), Turn::user("Jane"), Turn::assistant("hi")]
        );
        assert!(rt.store().pending("greeter", "t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resume_without_pending_fails() {
        let rt = runtime();
        let err = rt
            .invoke(&Greeter, "t1", Invocation::Resume(json!("x")))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::NothingToResume));
    }

    #[tokio::test]
    async fn test_new_start_discards_pending() {
        let rt = runtime();
        rt.invoke(&Greeter, "t1", Invocation::Start(StateUpdate::default()))
            .await
            .unwrap();
        let outcome = rt
            .invoke(
                &Greeter,
                "t1",
                Invocation::Start(StateUpdate::default().append_message(Turn::user("again"))),
            )
            .await
            .unwrap();

        // Entry node suspends again; the old interrupt was replaced, not resumed
        assert_eq!(outcome.prompt(), Some(&json!("name?")));
        assert_eq!(
            outcome.state().messages,
            vec![Turn::assistant("asking"), Turn::user("again"), Turn::assistant("asking")]
        );
    }

    #[tokio::test]
    async fn test_start_checks_tool_results_against_history() {
        let rt = runtime();
        rt.store()
            .apply_update(
                "greeter",
                "t1",
                StateUpdate::default().append_message(Turn::assistant_with_calls(
                    "",
                    vec![ToolCall::new("c1", "search_internet", json!({}))],
                )),
            )
            .await
            .unwrap();

        let err = rt
            .invoke(
                &Greeter,
                "t1",
                Invocation::Start(StateUpdate::default().append_message(Turn::tool_result("c9", "x"))),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::ToolOrdering(ref orphan) if orphan.call_id == "c9"));
        assert_eq!(rt.store().get_state("greeter", "t1").await.unwrap().messages.len(), 1);

        // A result for a call already in the thread is accepted
        let outcome = rt
            .invoke(
                &Greeter,
                "t1",
                Invocation::Start(StateUpdate::default().append_message(Turn::tool_result("c1", "x"))),
            )
            .await
            .unwrap();
        assert_eq!(outcome.state().messages[1], Turn::tool_result("c1", "x"));
    }

    #[tokio::test]
    async fn test_step_limit() {
        let rt = runtime();
        let err = rt
            .invoke(&Looper, "t1", Invocation::Start(StateUpdate::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::StepLimitExceeded(MAX_GRAPH_STEPS)));
    }

    #[test]
    fn test_outcome_wire_shape() {
        let completed = serde_json::to_value(Outcome::Completed {
            state: ConversationState::default(),
        })
        .unwrap();
        assert_eq!(completed["status"], "completed");

        let waiting = serde_json::to_value(Outcome::AwaitingInput {
            prompt: json!("Please enter your full name"),
            state: ConversationState::default(),
        })
        .unwrap();
        assert_eq!(waiting["status"], "awaiting_input");
        assert_eq!(waiting["prompt"], "Please enter your full name");
    }
}
