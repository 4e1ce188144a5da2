//! Conversation turn types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool invocation requested by the model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub args: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }
}

/// One unit of conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Turn {
    User {
        text: String,
    },
    Assistant {
        #[serde(default)]
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    ToolResult {
        call_id: String,
        content: String,
    },
    System {
        text: String,
    },
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Turn::User { text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Turn::Assistant {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant_with_calls(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Turn::Assistant {
            text: text.into(),
            tool_calls,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Turn::ToolResult {
            call_id: call_id.into(),
            content: content.into(),
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn system(text: impl Into<String>) -> Self {
        Turn::System { text: text.into() }
    }

    /// Tool calls still waiting for results; empty for anything but an assistant turn
    pub fn pending_tool_calls(&self) -> &[ToolCall] {
        match self {
            Turn::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    pub fn has_pending_tool_calls(&self) -> bool {
        !self.pending_tool_calls().is_empty()
    }

    /// Text body of the turn (tool output for tool results)
    #[allow(dead_code)] // Used in tests
    pub fn text(&self) -> &str {
        match self {
            Turn::User { text } | Turn::Assistant { text, .. } | Turn::System { text } => text,
            Turn::ToolResult { content, .. } => content,
        }
    }

    /// Storage tag, matching the serde tag
    pub fn kind(&self) -> &'static str {
        match self {
            Turn::User { .. } => "user",
            Turn::Assistant { .. } => "assistant",
            Turn::ToolResult { .. } => "tool_result",
            Turn::System { .. } => "system",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_turn_wire_format() {
        let turn = Turn::assistant_with_calls(
            "looking",
            vec![ToolCall::new("c1", "search_internet", json!({"query": "rust"}))],
        );
        let value = serde_json::to_value(&turn).unwrap();
        assert_eq!(value["type"], "assistant");
        assert_eq!(value["tool_calls"][0]["name"], "search_internet");

        let plain = serde_json::to_value(Turn::assistant("hi")).unwrap();
        assert!(plain.get("tool_calls").is_none());
    }

    #[test]
    fn test_empty_tool_call_object_still_counts_as_pending() {
        let turn: Turn = serde_json::from_value(json!({
            "type": "assistant",
            "tool_calls": [{}]
        }))
        .unwrap();
        assert!(turn.has_pending_tool_calls());
        assert_eq!(turn.text(), "");
    }

    #[test]
    fn test_only_assistant_turns_carry_calls() {
        assert!(Turn::user("x").pending_tool_calls().is_empty());
        assert!(Turn::tool_result("c1", "x").pending_tool_calls().is_empty());
        assert!(Turn::system("x").pending_tool_calls().is_empty());
    }
}
