//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the graph runtime with mock implementations.

use super::executor::RuntimeError;
use crate::conversation::{ConversationState, StateUpdate};
use crate::db::{Database, DbResult, PendingInterrupt, ThreadRecord, ThreadSummary};
use crate::llm::{LlmError, LlmRequest, LlmResponse, ModelRegistry, ToolDefinition};
use crate::tools::{ToolContext, ToolError, ToolRegistry, ToolValue};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Per-thread state persistence, partitioned by agent
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Load state and pending interrupt; unknown threads read as empty
    async fn load(&self, agent: &str, thread_id: &str) -> DbResult<ThreadRecord>;

    async fn get_state(&self, agent: &str, thread_id: &str) -> DbResult<ConversationState> {
        Ok(self.load(agent, thread_id).await?.state)
    }

    /// Merge an update into the stored state and return the result
    async fn apply_update(
        &self,
        agent: &str,
        thread_id: &str,
        update: StateUpdate,
    ) -> DbResult<ConversationState>;

    async fn pending(&self, agent: &str, thread_id: &str) -> DbResult<Option<PendingInterrupt>> {
        Ok(self.load(agent, thread_id).await?.pending)
    }

    async fn set_pending(
        &self,
        agent: &str,
        thread_id: &str,
        pending: Option<PendingInterrupt>,
    ) -> DbResult<()>;

    /// Returns whether the thread existed
    async fn delete_thread(&self, agent: &str, thread_id: &str) -> DbResult<bool>;

    async fn list_threads(&self, agent: &str) -> DbResult<Vec<ThreadSummary>>;
}

/// Client for making LLM requests
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete an LLM request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Executor for tools
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute a tool by name; `None` when the name is unknown
    async fn execute(
        &self,
        name: &str,
        input: Value,
        ctx: ToolContext,
    ) -> Option<Result<ToolValue, ToolError>>;

    /// Get tool definitions for LLM
    fn definitions(&self) -> Vec<ToolDefinition>;
}

// ============================================================================
// Agent graphs
// ============================================================================

/// Everything a node may use while it runs
pub struct NodeContext<'a> {
    pub thread_id: &'a str,
    pub llm: &'a dyn LlmClient,
    pub tools: &'a dyn ToolExecutor,
    pub tool_ctx: ToolContext,
}

/// Result of running one node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutput {
    /// Commit the update and follow the agent's edges
    Continue(StateUpdate),
    /// Commit the update, then wait for caller input
    Suspend { update: StateUpdate, prompt: Value },
}

/// Edge decision after a node completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next<N> {
    Node(N),
    End,
}

/// A graph of nodes over a conversation thread
#[async_trait]
pub trait Agent: Send + Sync {
    /// Node identifier; serialized into pending interrupts
    type Node: Copy + Eq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync;

    /// Storage partition name
    fn name(&self) -> &'static str;

    fn entry(&self, state: &ConversationState) -> Self::Node;

    /// Run one node. `reply` carries the caller's value when the node is
    /// resumed after suspending.
    async fn run_node(
        &self,
        node: Self::Node,
        state: &ConversationState,
        reply: Option<Value>,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, RuntimeError>;

    fn next(&self, from: Self::Node, state: &ConversationState) -> Next<Self::Node>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: Checkpointer + ?Sized> Checkpointer for Arc<T> {
    async fn load(&self, agent: &str, thread_id: &str) -> DbResult<ThreadRecord> {
        (**self).load(agent, thread_id).await
    }

    async fn apply_update(
        &self,
        agent: &str,
        thread_id: &str,
        update: StateUpdate,
    ) -> DbResult<ConversationState> {
        (**self).apply_update(agent, thread_id, update).await
    }

    async fn pending(&self, agent: &str, thread_id: &str) -> DbResult<Option<PendingInterrupt>> {
        (**self).pending(agent, thread_id).await
    }

    async fn set_pending(
        &self,
        agent: &str,
        thread_id: &str,
        pending: Option<PendingInterrupt>,
    ) -> DbResult<()> {
        (**self).set_pending(agent, thread_id, pending).await
    }

    async fn delete_thread(&self, agent: &str, thread_id: &str) -> DbResult<bool> {
        (**self).delete_thread(agent, thread_id).await
    }

    async fn list_threads(&self, agent: &str) -> DbResult<Vec<ThreadSummary>> {
        (**self).list_threads(agent).await
    }
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        (**self).complete(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

#[async_trait]
impl<T: ToolExecutor + ?Sized> ToolExecutor for Arc<T> {
    async fn execute(
        &self,
        name: &str,
        input: Value,
        ctx: ToolContext,
    ) -> Option<Result<ToolValue, ToolError>> {
        (**self).execute(name, input, ctx).await
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        (**self).definitions()
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as a Checkpointer
#[derive(Clone)]
pub struct DatabaseCheckpointer {
    db: Database,
}

impl DatabaseCheckpointer {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Checkpointer for DatabaseCheckpointer {
    async fn load(&self, agent: &str, thread_id: &str) -> DbResult<ThreadRecord> {
        self.db.load_thread(agent, thread_id)
    }

    async fn apply_update(
        &self,
        agent: &str,
        thread_id: &str,
        update: StateUpdate,
    ) -> DbResult<ConversationState> {
        self.db.apply_update(agent, thread_id, update)
    }

    async fn pending(&self, agent: &str, thread_id: &str) -> DbResult<Option<PendingInterrupt>> {
        self.db.pending(agent, thread_id)
    }

    async fn set_pending(
        &self,
        agent: &str,
        thread_id: &str,
        pending: Option<PendingInterrupt>,
    ) -> DbResult<()> {
        self.db.set_pending(agent, thread_id, pending.as_ref())
    }

    async fn delete_thread(&self, agent: &str, thread_id: &str) -> DbResult<bool> {
        self.db.delete_thread(agent, thread_id)
    }

    async fn list_threads(&self, agent: &str) -> DbResult<Vec<ThreadSummary>> {
        self.db.list_threads(agent)
    }
}

struct MemoryThread {
    record: ThreadRecord,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MemoryThread {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            record: ThreadRecord::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Process-local checkpointer; state is lost on restart
#[derive(Default)]
pub struct MemoryCheckpointer {
    threads: Mutex<HashMap<(String, String), MemoryThread>>,
}

impl MemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(agent: &str, thread_id: &str) -> (String, String) {
        (agent.to_string(), thread_id.to_string())
    }
}

#[async_trait]
impl Checkpointer for MemoryCheckpointer {
    async fn load(&self, agent: &str, thread_id: &str) -> DbResult<ThreadRecord> {
        let threads = self.threads.lock().unwrap();
        Ok(threads
            .get(&Self::key(agent, thread_id))
            .map(|t| t.record.clone())
            .unwrap_or_default())
    }

    async fn apply_update(
        &self,
        agent: &str,
        thread_id: &str,
        update: StateUpdate,
    ) -> DbResult<ConversationState> {
        let mut threads = self.threads.lock().unwrap();
        let thread = threads
            .entry(Self::key(agent, thread_id))
            .or_insert_with(MemoryThread::new);
        thread.record.state.apply(update);
        thread.updated_at = Utc::now();
        Ok(thread.record.state.clone())
    }

    async fn set_pending(
        &self,
        agent: &str,
        thread_id: &str,
        pending: Option<PendingInterrupt>,
    ) -> DbResult<()> {
        let mut threads = self.threads.lock().unwrap();
        let thread = threads
            .entry(Self::key(agent, thread_id))
            .or_insert_with(MemoryThread::new);
        thread.record.pending = pending;
        thread.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_thread(&self, agent: &str, thread_id: &str) -> DbResult<bool> {
        let mut threads = self.threads.lock().unwrap();
        Ok(threads.remove(&Self::key(agent, thread_id)).is_some())
    }

    async fn list_threads(&self, agent: &str) -> DbResult<Vec<ThreadSummary>> {
        let threads = self.threads.lock().unwrap();
        let mut summaries: Vec<ThreadSummary> = threads
            .iter()
            .filter(|((owner, _), _)| owner == agent)
            .map(|((_, thread_id), thread)| ThreadSummary {
                thread_id: thread_id.clone(),
                created_at: thread.created_at,
                updated_at: thread.updated_at,
                message_count: i64::try_from(thread.record.state.messages.len()).unwrap_or(i64::MAX),
                awaiting_input: thread.record.pending.is_some(),
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }
}

/// Adapter to use ModelRegistry as LlmClient
pub struct RegistryLlmClient {
    registry: Arc<ModelRegistry>,
    model_id: String,
}

impl RegistryLlmClient {
    pub fn new(registry: Arc<ModelRegistry>, model_id: String) -> Self {
        Self { registry, model_id }
    }
}

#[async_trait]
impl LlmClient for RegistryLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let llm = self
            .registry
            .get(&self.model_id)
            .or_else(|| self.registry.default())
            .ok_or_else(|| LlmError::auth("No LLM available; set OPENAI_API_KEY or GEMINI_API_KEY"))?;
        llm.complete(request).await
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Adapter to use ToolRegistry as ToolExecutor
pub struct ToolRegistryExecutor {
    registry: ToolRegistry,
}

impl ToolRegistryExecutor {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistryExecutor {
    async fn execute(
        &self,
        name: &str,
        input: Value,
        ctx: ToolContext,
    ) -> Option<Result<ToolValue, ToolError>> {
        self.registry.execute(name, input, ctx).await
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }
}
