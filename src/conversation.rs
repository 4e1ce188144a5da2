//! Per-thread conversation state
//!
//! The message accumulator: typed turns, the state record each agent reads,
//! and the partial updates nodes return. Updates merge field by field:
//! sequences append (optionally after a clear-all), scalars replace.

pub mod state;
pub mod turn;
pub mod update;

pub use state::{Answer, ConversationState, InterviewRules, Phase, Question, Segment};
pub use turn::{ToolCall, Turn};
pub use update::{SequenceUpdate, StateUpdate};

use std::collections::HashSet;
use thiserror::Error;

/// A sequence of turns that breaks the tool-result ordering rule
#[derive(Debug, Error, PartialEq, Eq)]
#[error("tool result at position {position} references unknown call id {call_id:?}")]
pub struct OrphanToolResult {
    pub position: usize,
    pub call_id: String,
}

/// Check that every `ToolResult` answers a call issued earlier in `turns`.
pub fn validate_tool_results<'a>(
    turns: impl IntoIterator<Item = &'a Turn>,
) -> Result<(), OrphanToolResult> {
    let mut issued: HashSet<&str> = HashSet::new();
    for (position, turn) in turns.into_iter().enumerate() {
        match turn {
            Turn::Assistant { tool_calls, .. } => {
                issued.extend(tool_calls.iter().map(|c| c.id.as_str()));
            }
            Turn::ToolResult { call_id, .. } if !issued.contains(call_id.as_str()) => {
                return Err(OrphanToolResult {
                    position,
                    call_id: call_id.clone(),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

/// Check both turn sequences as they would stand after merging `update`
pub fn validate_update(state: &ConversationState, update: &StateUpdate) -> Result<(), OrphanToolResult> {
    validate_tool_results(update.messages.merged(&state.messages))?;
    validate_tool_results(update.queries.merged(&state.queries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_result_after_its_call_is_valid() {
        let turns = vec![
            Turn::user("weather?"),
            Turn::assistant_with_calls("", vec![ToolCall::new("c1", "search_internet", serde_json::json!({}))]),
            Turn::tool_result("c1", "sunny"),
        ];
        assert_eq!(validate_tool_results(&turns), Ok(()));
    }

    #[test]
    fn test_tool_result_before_its_call_is_rejected() {
        let turns = vec![
            Turn::tool_result("c1", "sunny"),
            Turn::assistant_with_calls("", vec![ToolCall::new("c1", "search_internet", serde_json::json!({}))]),
        ];
        let err = validate_tool_results(&turns).unwrap_err();
        assert_eq!(err.position, 0);
        assert_eq!(err.call_id, "c1");
    }

    #[test]
    fn test_update_checked_against_stored_history() {
        let state = ConversationState {
            messages: vec![Turn::assistant_with_calls(
                "",
                vec![ToolCall::new("c1", "search_internet", serde_json::json!({}))],
            )],
            ..Default::default()
        };
        let answer = StateUpdate::default().append_message(Turn::tool_result("c1", "sunny"));
        assert_eq!(validate_update(&state, &answer), Ok(()));

        // Clearing drops the call the result would answer
        let cleared = StateUpdate {
            messages: SequenceUpdate {
                clear: true,
                append: vec![Turn::tool_result("c1", "sunny")],
            },
            ..Default::default()
        };
        assert_eq!(validate_update(&state, &cleared).unwrap_err().position, 0);

        let orphan = StateUpdate::default().append_query(Turn::tool_result("c1", "sunny"));
        assert_eq!(validate_update(&state, &orphan).unwrap_err().call_id, "c1");
    }
}
