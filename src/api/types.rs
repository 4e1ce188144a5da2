//! API request and response types

use crate::config::InterviewFormat;
use crate::conversation::{InterviewRules, Phase, Segment, StateUpdate, Turn};
use crate::db::ThreadSummary;
use crate::runtime::Outcome;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Caller input merged into a thread before the agent runs. Tool-result
/// ordering is checked by the runtime against the stored thread.
#[derive(Debug, Default, Deserialize)]
pub struct InvokeRequest {
    #[serde(default)]
    pub messages: Vec<Turn>,
    #[serde(default)]
    pub queries: Vec<Turn>,
    pub segment: Option<Segment>,
    pub phase: Option<Phase>,
    pub rules: Option<InterviewRules>,
    /// Shorthand for a single user message
    pub text: Option<String>,
}

impl InvokeRequest {
    pub fn into_update(self) -> StateUpdate {
        let mut messages = self.messages;
        if let Some(text) = self.text {
            messages.push(Turn::user(text));
        }

        let mut update = StateUpdate::default()
            .append_messages(messages)
            .append_queries(self.queries);
        update.segment = self.segment;
        update.phase = self.phase;
        update.rules = self.rules;
        update
    }
}

/// Answer to a pending interrupt; substituted verbatim
#[derive(Debug, Deserialize)]
pub struct ResumeRequest {
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Serialize)]
pub struct CreateThreadResponse {
    pub thread_id: String,
}

#[derive(Debug, Serialize)]
pub struct InvokeResponse {
    pub thread_id: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Serialize)]
pub struct ThreadListResponse {
    pub threads: Vec<ThreadSummary>,
}

/// Stored state of a thread plus its pending prompt, if any
#[derive(Debug, Serialize)]
pub struct ThreadResponse {
    pub thread_id: String,
    pub state: Value,
    pub awaiting_input: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct InterviewFormatsResponse {
    pub default: String,
    pub formats: BTreeMap<String, InterviewFormat>,
}

#[derive(Debug, Serialize)]
pub struct ToolRouteResponse {
    pub route: &'static str,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Model information with metadata
#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub provider: String,
    pub description: String,
    pub context_window: usize,
}

/// Response for model list
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
    pub default: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::ConversationState;
    use serde_json::json;

    #[test]
    fn test_invoke_request_shorthand() {
        let req: InvokeRequest = serde_json::from_value(json!({
            "text": "top headlines please",
            "segment": "headlines"
        }))
        .unwrap();
        let update = req.into_update();
        assert_eq!(update.messages.append, vec![Turn::user("top headlines please")]);
        assert_eq!(update.segment, Some(Segment::Headlines));
        assert!(update.phase.is_none());
    }

    #[test]
    fn test_invoke_request_rules_and_phase() {
        let req: InvokeRequest = serde_json::from_value(json!({
            "phase": "q&a",
            "rules": {"format": "short"}
        }))
        .unwrap();
        let update = req.into_update();
        assert_eq!(update.phase, Some(Phase::Execution));
        assert_eq!(update.rules.unwrap().format.as_deref(), Some("short"));
        assert!(update.messages.is_empty());
    }

    #[test]
    fn test_invoke_request_keeps_tool_results_for_stored_calls() {
        let req: InvokeRequest = serde_json::from_value(json!({
            "messages": [{"type": "tool_result", "call_id": "c1", "content": "x"}]
        }))
        .unwrap();
        assert_eq!(req.into_update().messages.append, vec![Turn::tool_result("c1", "x")]);
    }

    #[test]
    fn test_invoke_response_shape() {
        let response = InvokeResponse {
            thread_id: "t1".into(),
            outcome: Outcome::AwaitingInput {
                prompt: json!("Please enter your full name"),
                state: ConversationState::default(),
            },
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "awaiting_input");
        assert_eq!(value["prompt"], "Please enter your full name");
        assert_eq!(value["thread_id"], "t1");
        assert_eq!(value["state"]["messages"], json!([]));
    }
}
