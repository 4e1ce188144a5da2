//! Mock implementations for testing
//!
//! These mocks let agents and the graph runtime run without real I/O.

use super::traits::{LlmClient, ToolExecutor};
use crate::llm::{ContentBlock, LlmError, LlmRequest, LlmResponse, ToolDefinition, Usage};
use crate::tools::{ToolContext, ToolError, ToolValue};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a plain text response
    pub fn queue_text(&self, text: impl Into<String>) {
        self.queue_response(LlmResponse::from_text(text));
    }

    /// Queue a response that only requests tool calls
    pub fn queue_tool_calls(&self, calls: &[(&str, &str, Value)]) {
        self.queue_response(tool_call_response(calls));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Build a response consisting of tool-use blocks
pub fn tool_call_response(calls: &[(&str, &str, Value)]) -> LlmResponse {
    LlmResponse {
        content: calls
            .iter()
            .map(|(id, name, input)| ContentBlock::tool_use(*id, *name, input.clone()))
            .collect(),
        end_turn: false,
        usage: Usage::default(),
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Mock Tool Executor
// ============================================================================

#[derive(Clone)]
enum MockOutcome {
    Value(ToolValue),
    Failure(String),
}

/// Mock tool executor with predefined outputs
#[derive(Default)]
pub struct MockToolExecutor {
    outputs: HashMap<String, MockOutcome>,
    definitions: Vec<ToolDefinition>,
    /// Record of tool executions
    executions: Mutex<Vec<(String, Value)>>,
}

impl MockToolExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(mut self, name: String, outcome: MockOutcome) -> Self {
        self.definitions.push(ToolDefinition {
            name: name.clone(),
            description: format!("Mock {name}"),
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
        });
        self.outputs.insert(name, outcome);
        self
    }

    /// Add a tool with a predefined output
    pub fn with_tool(self, name: impl Into<String>, output: ToolValue) -> Self {
        self.register(name.into(), MockOutcome::Value(output))
    }

    /// Add a tool that always fails
    pub fn with_failing_tool(self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.register(name.into(), MockOutcome::Failure(message.into()))
    }

    /// Get recorded executions
    pub fn recorded_executions(&self) -> Vec<(String, Value)> {
        self.executions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolExecutor for MockToolExecutor {
    async fn execute(
        &self,
        name: &str,
        input: Value,
        _ctx: ToolContext,
    ) -> Option<Result<ToolValue, ToolError>> {
        self.executions
            .lock()
            .unwrap()
            .push((name.to_string(), input));
        self.outputs.get(name).cloned().map(|outcome| match outcome {
            MockOutcome::Value(value) => Ok(value),
            MockOutcome::Failure(message) => Err(ToolError::Failed(message)),
        })
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        self.definitions.clone()
    }
}
