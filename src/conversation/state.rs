//! Conversation state record

use super::{StateUpdate, Turn};
use crate::agents::interview::InterviewCursor;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ============================================================================
// Routing tags
// ============================================================================

/// News segment requested by the caller
///
/// Tags outside the known set map to `Query`, so routing never fails on an
/// unrecognized value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Headlines,
    Stories,
    Summary,
    Query,
}

impl Segment {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "headlines" => Segment::Headlines,
            "stories" => Segment::Stories,
            "summary" => Segment::Summary,
            _ => Segment::Query,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Segment::Headlines => "headlines",
            Segment::Stories => "stories",
            Segment::Summary => "summary",
            Segment::Query => "query",
        }
    }
}

/// Interview phase requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Execution,
    Reporting,
}

impl Phase {
    /// `"q&a"` is what interview front ends send for the question round.
    /// Unknown tags fall back to `Execution`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "reporting" | "report" => Phase::Reporting,
            _ => Phase::Execution,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Execution => "execution",
            Phase::Reporting => "reporting",
        }
    }
}

macro_rules! tag_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let tag = String::deserialize(deserializer)?;
                Ok(Self::from_tag(&tag))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

tag_serde!(Segment);
tag_serde!(Phase);

// ============================================================================
// Interview records
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Practical,
    Theory,
}

/// A generated interview question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    /// Companies known to ask this kind of question
    #[serde(default)]
    pub companies: Vec<String>,
}

/// A candidate's answer, paired with the question text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
}

/// Interview rules; callers may send any subset, the perception stage
/// fills the rest from the format catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Minutes allowed per question
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_frame: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_of_questions: Option<u32>,
}

// ============================================================================
// State record
// ============================================================================

/// Everything persisted for one conversation thread
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    #[serde(default)]
    pub messages: Vec<Turn>,
    /// Private sub-conversation of the news agent
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<Turn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<Segment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<Question>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub answers: Vec<Answer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<InterviewRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview: Option<InterviewCursor>,
}

impl ConversationState {
    /// Merge a partial update into this state
    pub fn apply(&mut self, update: StateUpdate) {
        let StateUpdate {
            messages,
            queries,
            questions,
            answers,
            segment,
            phase,
            rules,
            interview,
        } = update;

        messages.apply_to(&mut self.messages);
        queries.apply_to(&mut self.queries);
        questions.apply_to(&mut self.questions);
        answers.apply_to(&mut self.answers);

        if segment.is_some() {
            self.segment = segment;
        }
        if phase.is_some() {
            self.phase = phase;
        }
        if rules.is_some() {
            self.rules = rules;
        }
        if interview.is_some() {
            self.interview = interview;
        }
    }

    pub fn last_message(&self) -> Option<&Turn> {
        self.messages.last()
    }

    pub fn last_query(&self) -> Option<&Turn> {
        self.queries.last()
    }

    pub fn phase(&self) -> Phase {
        self.phase.unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
