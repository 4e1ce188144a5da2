//! Database schema and types

use crate::conversation::ConversationState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS threads (
    agent TEXT NOT NULL,
    thread_id TEXT NOT NULL,
    segment TEXT,
    phase TEXT,
    rules TEXT,
    interview TEXT,
    questions TEXT NOT NULL DEFAULT '[]',
    answers TEXT NOT NULL DEFAULT '[]',
    pending_interrupt TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,

    PRIMARY KEY (agent, thread_id)
);

CREATE INDEX IF NOT EXISTS idx_threads_updated ON threads(agent, updated_at DESC);

CREATE TABLE IF NOT EXISTS turns (
    agent TEXT NOT NULL,
    thread_id TEXT NOT NULL,
    channel TEXT NOT NULL,
    sequence_id INTEGER NOT NULL,
    kind TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,

    PRIMARY KEY (agent, thread_id, channel, sequence_id),
    FOREIGN KEY (agent, thread_id) REFERENCES threads(agent, thread_id) ON DELETE CASCADE
);
";

/// Which turn sequence a row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Messages,
    Queries,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Messages => "messages",
            Channel::Queries => "queries",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A suspended node waiting for caller input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingInterrupt {
    /// The agent's node identifier, serialized
    pub node: Value,
    /// Value surfaced to the caller
    pub prompt: Value,
}

/// Everything stored for one (agent, thread) pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreadRecord {
    pub state: ConversationState,
    pub pending: Option<PendingInterrupt>,
}

/// Thread listing entry
#[derive(Debug, Clone, Serialize)]
pub struct ThreadSummary {
    pub thread_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: i64,
    pub awaiting_input: bool,
}
