//! Conditional edges shared by the agent graphs
//!
//! All functions here are pure: they only look at the state they are given.

#[cfg(test)]
mod proptests;

use crate::agents::interview::InterviewNode;
use crate::agents::news::NewsNode;
use crate::conversation::{ConversationState, Phase, Segment, Turn};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Outcome of the tool-call predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Tools,
    End,
}

impl Branch {
    pub fn as_str(self) -> &'static str {
        match self {
            Branch::Tools => "tools",
            Branch::End => "end",
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("expected a turn list or a state record, got {0}")]
    MalformedState(&'static str),
    #[error("invalid state record: {0}")]
    InvalidRecord(#[from] serde_json::Error),
}

/// Pick the news node for the requested segment. Absent or unrecognized
/// segments go to the query node.
pub fn route(state: &ConversationState) -> NewsNode {
    match state.segment {
        Some(Segment::Headlines) => NewsNode::Headlines,
        Some(Segment::Stories) => NewsNode::Stories,
        Some(Segment::Summary | Segment::Query) | None => NewsNode::Query,
    }
}

/// Pick the interview entry node for the requested phase
pub fn phase_entry(state: &ConversationState) -> InterviewNode {
    match state.phase() {
        Phase::Execution => InterviewNode::Perception,
        Phase::Reporting => InterviewNode::Report,
    }
}

/// `Tools` when the last turn of `messages` or of `queries` is an assistant
/// turn with at least one pending tool call.
pub fn needs_tools(state: &ConversationState) -> Branch {
    let pending = |turn: Option<&Turn>| turn.is_some_and(Turn::has_pending_tool_calls);
    if pending(state.last_message()) || pending(state.last_query()) {
        Branch::Tools
    } else {
        Branch::End
    }
}

/// Predicate over a bare turn list
pub fn needs_tools_in(turns: &[Turn]) -> Branch {
    if turns.last().is_some_and(Turn::has_pending_tool_calls) {
        Branch::Tools
    } else {
        Branch::End
    }
}

/// Predicate over untyped input: an array is a turn list, an object a state
/// record. Any other shape is a caller error.
pub fn needs_tools_json(input: &Value) -> Result<Branch, RoutingError> {
    match input {
        Value::Array(_) => {
            let turns: Vec<Turn> = serde_json::from_value(input.clone())?;
            Ok(needs_tools_in(&turns))
        }
        Value::Object(_) => {
            let state: ConversationState = serde_json::from_value(input.clone())?;
            Ok(needs_tools(&state))
        }
        Value::Null => Err(RoutingError::MalformedState("null")),
        Value::Bool(_) => Err(RoutingError::MalformedState("a boolean")),
        Value::Number(_) => Err(RoutingError::MalformedState("a number")),
        Value::String(_) => Err(RoutingError::MalformedState("a string")),
    }
}
