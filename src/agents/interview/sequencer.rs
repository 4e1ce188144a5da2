//! Human-in-the-loop collection stages of the interview
//!
//! Both stages are pure: given the persisted cursor (or answers so far) and
//! the caller's reply, they return the update to commit and either the next
//! prompt or completion. Replaying the same state with the same reply always
//! yields the same output.

use crate::conversation::{Answer, Question, StateUpdate, Turn};
use crate::runtime::{NodeOutput, RuntimeError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const NAME_PROMPT: &str = "Please enter your full name";
pub const ROLE_PROMPT: &str = "Job role you want to interview for";
pub const COMPANIES_PROMPT: &str = "Please enter comma separated names of companies you prefer";

/// Where an interview currently stands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStage {
    #[default]
    CandidateInfo,
    Questions,
    Answers,
    Evaluation,
    Complete,
}

/// Candidate fields collected so far
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companies: Option<String>,
}

/// Fully collected candidate details, serialized into the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub role: String,
    pub companies: String,
}

impl CandidateDraft {
    /// Prompt for the first field still missing
    pub fn next_prompt(&self) -> Option<&'static str> {
        if self.name.is_none() {
            Some(NAME_PROMPT)
        } else if self.role.is_none() {
            Some(ROLE_PROMPT)
        } else if self.companies.is_none() {
            Some(COMPANIES_PROMPT)
        } else {
            None
        }
    }

    /// Fill the first missing field; a full draft is left alone
    fn fill(&mut self, value: String) {
        let slot = [&mut self.name, &mut self.role, &mut self.companies]
            .into_iter()
            .find(|field| field.is_none());
        if let Some(slot) = slot {
            *slot = Some(value);
        }
    }

    pub fn complete(&self) -> Option<Candidate> {
        Some(Candidate {
            name: self.name.clone()?,
            role: self.role.clone()?,
            companies: self.companies.clone()?,
        })
    }
}

/// Persisted interview progress
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewCursor {
    pub stage: InterviewStage,
    #[serde(default)]
    pub candidate: CandidateDraft,
}

impl InterviewCursor {
    pub fn at(&self, stage: InterviewStage) -> Self {
        Self {
            stage,
            candidate: self.candidate.clone(),
        }
    }
}

/// Scalar replies are used as text; anything else keeps its JSON encoding
pub fn reply_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Ask for name, role and preferred companies, one suspend each
pub fn collect_candidate(cursor: &InterviewCursor, reply: Option<Value>) -> Result<NodeOutput, RuntimeError> {
    let mut next = cursor.at(InterviewStage::CandidateInfo);
    let mut update = StateUpdate::default();
    if let Some(value) = reply {
        next.candidate.fill(reply_text(value));
        update = update.with_cursor(next.clone());
    }

    if let Some(prompt) = next.candidate.next_prompt() {
        return Ok(NodeOutput::Suspend {
            update,
            prompt: Value::String(prompt.to_string()),
        });
    }

    let candidate = next
        .candidate
        .complete()
        .ok_or_else(|| RuntimeError::InvalidState("candidate details incomplete".into()))?;
    Ok(NodeOutput::Continue(
        StateUpdate::default()
            .with_cursor(next.at(InterviewStage::Questions))
            .append_message(Turn::user(serde_json::to_string(&candidate)?)),
    ))
}

/// Ask each question in order; after the last answer, append all answers
/// as one user turn.
pub fn collect_answer(
    cursor: &InterviewCursor,
    questions: &[Question],
    answers: &[Answer],
    reply: Option<Value>,
) -> Result<NodeOutput, RuntimeError> {
    let mut collected = answers.to_vec();
    let mut update = StateUpdate::default();

    if let Some(value) = reply {
        if let Some(question) = questions.get(collected.len()) {
            let answer = Answer {
                question: question.question.clone(),
                answer: reply_text(value),
            };
            collected.push(answer.clone());
            update = update.append_answer(answer);
        }
    }

    if let Some(question) = questions.get(collected.len()) {
        return Ok(NodeOutput::Suspend {
            update: update.with_cursor(cursor.at(InterviewStage::Answers)),
            prompt: serde_json::to_value(question)?,
        });
    }

    Ok(NodeOutput::Continue(
        update
            .with_cursor(cursor.at(InterviewStage::Evaluation))
            .append_message(Turn::user(serde_json::to_string(&collected)?)),
    ))
}
