//! Database module for parley
//!
//! Persists conversation threads per (agent, thread id): turn sequences as
//! rows, the remaining state fields as JSON columns.

mod schema;

pub use schema::*;

use crate::conversation::{
    ConversationState, Phase, Segment, SequenceUpdate, StateUpdate, Turn,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Corrupt stored record: {0}")]
    Json(#[from] serde_json::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// Raw `threads` row before JSON decoding
struct ThreadRow {
    segment: Option<String>,
    phase: Option<String>,
    rules: Option<String>,
    interview: Option<String>,
    questions: String,
    answers: String,
    pending: Option<String>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Thread Operations ====================

    /// Load a thread; unknown threads read as empty state
    pub fn load_thread(&self, agent: &str, thread_id: &str) -> DbResult<ThreadRecord> {
        let conn = self.conn.lock().unwrap();
        load_thread_locked(&conn, agent, thread_id)
    }

    /// Merge a partial update into the stored state, atomically
    pub fn apply_update(
        &self,
        agent: &str,
        thread_id: &str,
        update: StateUpdate,
    ) -> DbResult<ConversationState> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        ensure_thread(&tx, agent, thread_id, &now)?;
        let mut state = load_thread_locked(&tx, agent, thread_id)?.state;

        write_turns(&tx, agent, thread_id, Channel::Messages, &update.messages, &now)?;
        write_turns(&tx, agent, thread_id, Channel::Queries, &update.queries, &now)?;
        state.apply(update);

        tx.execute(
            "UPDATE threads
             SET segment = ?3, phase = ?4, rules = ?5, interview = ?6,
                 questions = ?7, answers = ?8, updated_at = ?9
             WHERE agent = ?1 AND thread_id = ?2",
            params![
                agent,
                thread_id,
                state.segment.map(Segment::as_str),
                state.phase.map(Phase::as_str),
                state.rules.as_ref().map(serde_json::to_string).transpose()?,
                state.interview.as_ref().map(serde_json::to_string).transpose()?,
                serde_json::to_string(&state.questions)?,
                serde_json::to_string(&state.answers)?,
                now,
            ],
        )?;

        tx.commit()?;
        Ok(state)
    }

    /// Record or clear the pending interrupt of a thread
    pub fn set_pending(
        &self,
        agent: &str,
        thread_id: &str,
        pending: Option<&PendingInterrupt>,
    ) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        ensure_thread(&conn, agent, thread_id, &now)?;

        let encoded = pending.map(serde_json::to_string).transpose()?;
        conn.execute(
            "UPDATE threads SET pending_interrupt = ?3, updated_at = ?4
             WHERE agent = ?1 AND thread_id = ?2",
            params![agent, thread_id, encoded, now],
        )?;
        Ok(())
    }

    /// Get the pending interrupt of a thread, if any
    pub fn pending(&self, agent: &str, thread_id: &str) -> DbResult<Option<PendingInterrupt>> {
        let conn = self.conn.lock().unwrap();
        let raw: Option<Option<String>> = conn
            .query_row(
                "SELECT pending_interrupt FROM threads WHERE agent = ?1 AND thread_id = ?2",
                params![agent, thread_id],
                |row| row.get(0),
            )
            .optional()?;

        raw.flatten()
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(DbError::from)
    }

    /// Delete a thread and all of its turns
    pub fn delete_thread(&self, agent: &str, thread_id: &str) -> DbResult<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM turns WHERE agent = ?1 AND thread_id = ?2",
            params![agent, thread_id],
        )?;
        let deleted = tx.execute(
            "DELETE FROM threads WHERE agent = ?1 AND thread_id = ?2",
            params![agent, thread_id],
        )?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    /// List an agent's threads, most recently updated first
    pub fn list_threads(&self, agent: &str) -> DbResult<Vec<ThreadSummary>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT th.thread_id, th.created_at, th.updated_at,
                    (SELECT COUNT(*) FROM turns t
                     WHERE t.agent = th.agent AND t.thread_id = th.thread_id
                       AND t.channel = 'messages') AS message_count,
                    th.pending_interrupt IS NOT NULL
             FROM threads th WHERE th.agent = ?1
             ORDER BY th.updated_at DESC",
        )?;

        let rows = stmt.query_map(params![agent], |row| {
            Ok(ThreadSummary {
                thread_id: row.get(0)?,
                created_at: parse_datetime(&row.get::<_, String>(1)?),
                updated_at: parse_datetime(&row.get::<_, String>(2)?),
                message_count: row.get(3)?,
                awaiting_input: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

fn ensure_thread(conn: &Connection, agent: &str, thread_id: &str, now: &str) -> DbResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO threads (agent, thread_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?3)",
        params![agent, thread_id, now],
    )?;
    Ok(())
}

/// Load a thread using an already-held connection
fn load_thread_locked(conn: &Connection, agent: &str, thread_id: &str) -> DbResult<ThreadRecord> {
    let row = conn
        .query_row(
            "SELECT segment, phase, rules, interview, questions, answers, pending_interrupt
             FROM threads WHERE agent = ?1 AND thread_id = ?2",
            params![agent, thread_id],
            |row| {
                Ok(ThreadRow {
                    segment: row.get(0)?,
                    phase: row.get(1)?,
                    rules: row.get(2)?,
                    interview: row.get(3)?,
                    questions: row.get(4)?,
                    answers: row.get(5)?,
                    pending: row.get(6)?,
                })
            },
        )
        .optional()?;

    let Some(row) = row else {
        return Ok(ThreadRecord::default());
    };

    let state = ConversationState {
        messages: load_turns(conn, agent, thread_id, Channel::Messages)?,
        queries: load_turns(conn, agent, thread_id, Channel::Queries)?,
        segment: row.segment.as_deref().map(Segment::from_tag),
        phase: row.phase.as_deref().map(Phase::from_tag),
        questions: serde_json::from_str(&row.questions)?,
        answers: serde_json::from_str(&row.answers)?,
        rules: row.rules.as_deref().map(serde_json::from_str).transpose()?,
        interview: row.interview.as_deref().map(serde_json::from_str).transpose()?,
    };
    let pending = row.pending.as_deref().map(serde_json::from_str).transpose()?;

    Ok(ThreadRecord { state, pending })
}

fn load_turns(
    conn: &Connection,
    agent: &str,
    thread_id: &str,
    channel: Channel,
) -> DbResult<Vec<Turn>> {
    let mut stmt = conn.prepare(
        "SELECT content FROM turns
         WHERE agent = ?1 AND thread_id = ?2 AND channel = ?3
         ORDER BY sequence_id ASC",
    )?;
    let rows = stmt.query_map(params![agent, thread_id, channel.as_str()], |row| {
        row.get::<_, String>(0)
    })?;

    let mut turns = Vec::new();
    for content in rows {
        turns.push(serde_json::from_str(&content?)?);
    }
    Ok(turns)
}

fn write_turns(
    conn: &Connection,
    agent: &str,
    thread_id: &str,
    channel: Channel,
    update: &SequenceUpdate<Turn>,
    now: &str,
) -> DbResult<()> {
    if update.clear {
        conn.execute(
            "DELETE FROM turns WHERE agent = ?1 AND thread_id = ?2 AND channel = ?3",
            params![agent, thread_id, channel.as_str()],
        )?;
    }
    if update.append.is_empty() {
        return Ok(());
    }

    let mut sequence_id: i64 = conn.query_row(
        "SELECT COALESCE(MAX(sequence_id), 0) FROM turns
         WHERE agent = ?1 AND thread_id = ?2 AND channel = ?3",
        params![agent, thread_id, channel.as_str()],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(
        "INSERT INTO turns (agent, thread_id, channel, sequence_id, kind, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for turn in &update.append {
        sequence_id += 1;
        stmt.execute(params![
            agent,
            thread_id,
            channel.as_str(),
            sequence_id,
            turn.kind(),
            serde_json::to_string(turn)?,
            now,
        ])?;
    }
    Ok(())
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Answer, InterviewRules, ToolCall};
    use serde_json::json;

    #[test]
    fn test_unknown_thread_is_empty() {
        let db = Database::open_in_memory().unwrap();
        let record = db.load_thread("chat", "missing").unwrap();
        assert!(record.state.is_empty());
        assert!(record.pending.is_none());
    }

    #[test]
    fn test_apply_update_appends_in_order() {
        let db = Database::open_in_memory().unwrap();

        db.apply_update(
            "chat",
            "t1",
            StateUpdate::default().append_message(Turn::user("hello")),
        )
        .unwrap();
        let state = db
            .apply_update(
                "chat",
                "t1",
                StateUpdate::default().append_messages([
                    Turn::assistant_with_calls(
                        "",
                        vec![ToolCall::new("c1", "search_internet", json!({"query": "x"}))],
                    ),
                    Turn::tool_result("c1", "result"),
                ]),
            )
            .unwrap();

        assert_eq!(state.messages.len(), 3);
        let reloaded = db.load_thread("chat", "t1").unwrap().state;
        assert_eq!(reloaded, state);
        assert_eq!(reloaded.messages[0], Turn::user("hello"));
        assert_eq!(reloaded.messages[2], Turn::tool_result("c1", "result"));
    }

    #[test]
    fn test_clear_queries_then_append() {
        let db = Database::open_in_memory().unwrap();
        db.apply_update(
            "news",
            "t1",
            StateUpdate::default()
                .append_message(Turn::user("first"))
                .append_queries([Turn::user("first"), Turn::assistant("answer")]),
        )
        .unwrap();

        let state = db
            .apply_update(
                "news",
                "t1",
                StateUpdate::default()
                    .clear_queries()
                    .append_query(Turn::user("second")),
            )
            .unwrap();

        assert_eq!(state.queries, vec![Turn::user("second")]);
        assert_eq!(state.messages, vec![Turn::user("first")]);
        assert_eq!(db.load_thread("news", "t1").unwrap().state, state);
    }

    #[test]
    fn test_scalar_fields_replace() {
        let db = Database::open_in_memory().unwrap();
        let rules = InterviewRules {
            format: Some("standard".into()),
            time_frame: Some(1),
            no_of_questions: Some(5),
        };
        db.apply_update(
            "interview",
            "t1",
            StateUpdate::default()
                .with_phase(Phase::Execution)
                .with_rules(rules.clone())
                .append_answer(Answer {
                    question: "Q".into(),
                    answer: "A".into(),
                }),
        )
        .unwrap();
        let state = db
            .apply_update(
                "interview",
                "t1",
                StateUpdate::default().with_phase(Phase::Reporting),
            )
            .unwrap();

        assert_eq!(state.phase, Some(Phase::Reporting));
        assert_eq!(state.rules, Some(rules));
        assert_eq!(state.answers.len(), 1);
    }

    #[test]
    fn test_threads_partitioned_by_agent() {
        let db = Database::open_in_memory().unwrap();
        db.apply_update("chat", "same", StateUpdate::default().append_message(Turn::user("a")))
            .unwrap();
        db.apply_update("news", "same", StateUpdate::default().append_message(Turn::user("b")))
            .unwrap();

        assert_eq!(
            db.load_thread("chat", "same").unwrap().state.messages,
            vec![Turn::user("a")]
        );
        assert_eq!(
            db.load_thread("news", "same").unwrap().state.messages,
            vec![Turn::user("b")]
        );
    }

    #[test]
    fn test_pending_interrupt_set_and_clear() {
        let db = Database::open_in_memory().unwrap();
        let pending = PendingInterrupt {
            node: json!("candidate_info"),
            prompt: json!("Please enter your full name"),
        };

        db.set_pending("interview", "t1", Some(&pending)).unwrap();
        assert_eq!(db.pending("interview", "t1").unwrap(), Some(pending));

        db.set_pending("interview", "t1", None).unwrap();
        assert_eq!(db.pending("interview", "t1").unwrap(), None);
        assert_eq!(db.pending("interview", "nope").unwrap(), None);
    }

    #[test]
    fn test_delete_thread_then_empty() {
        let db = Database::open_in_memory().unwrap();
        db.apply_update(
            "chat",
            "t1",
            StateUpdate::default()
                .append_message(Turn::user("hi"))
                .append_query(Turn::user("q")),
        )
        .unwrap();

        assert!(db.delete_thread("chat", "t1").unwrap());
        assert!(!db.delete_thread("chat", "t1").unwrap());

        let record = db.load_thread("chat", "t1").unwrap();
        assert!(record.state.messages.is_empty());
        assert!(record.state.queries.is_empty());
    }

    #[test]
    fn test_list_threads() {
        let db = Database::open_in_memory().unwrap();
        db.apply_update("chat", "a", StateUpdate::default().append_message(Turn::user("1")))
            .unwrap();
        db.apply_update(
            "chat",
            "b",
            StateUpdate::default().append_messages([Turn::user("1"), Turn::assistant("2")]),
        )
        .unwrap();
        db.set_pending(
            "chat",
            "b",
            Some(&PendingInterrupt {
                node: json!("chat"),
                prompt: json!("?"),
            }),
        )
        .unwrap();

        let threads = db.list_threads("chat").unwrap();
        assert_eq!(threads.len(), 2);
        let b = threads.iter().find(|t| t.thread_id == "b").unwrap();
        assert_eq!(b.message_count, 2);
        assert!(b.awaiting_input);
        assert!(db.list_threads("news").unwrap().is_empty());
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parley.db");

        {
            let db = Database::open(&path).unwrap();
            db.apply_update("chat", "t1", StateUpdate::default().append_message(Turn::user("kept")))
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(
            db.load_thread("chat", "t1").unwrap().state.messages,
            vec![Turn::user("kept")]
        );
    }
}
