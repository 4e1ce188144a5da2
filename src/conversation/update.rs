//! Partial state updates returned by graph nodes

use super::{Answer, InterviewRules, Phase, Question, Segment, Turn};
use crate::agents::interview::InterviewCursor;

/// Update for an append-only sequence
///
/// `clear` is the clear-all directive; it runs before `append`.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceUpdate<T> {
    pub clear: bool,
    pub append: Vec<T>,
}

impl<T> Default for SequenceUpdate<T> {
    fn default() -> Self {
        Self {
            clear: false,
            append: Vec::new(),
        }
    }
}

impl<T> SequenceUpdate<T> {
    pub fn is_empty(&self) -> bool {
        !self.clear && self.append.is_empty()
    }

    /// Items `current` holds once this update is applied
    pub fn merged<'a>(&'a self, current: &'a [T]) -> impl Iterator<Item = &'a T> {
        let kept = if self.clear { &[][..] } else { current };
        kept.iter().chain(&self.append)
    }

    pub fn apply_to(self, target: &mut Vec<T>) {
        if self.clear {
            target.clear();
        }
        target.extend(self.append);
    }
}

/// Partial state returned by a node and merged by the checkpointer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub messages: SequenceUpdate<Turn>,
    pub queries: SequenceUpdate<Turn>,
    pub questions: SequenceUpdate<Question>,
    pub answers: SequenceUpdate<Answer>,
    pub segment: Option<Segment>,
    pub phase: Option<Phase>,
    pub rules: Option<InterviewRules>,
    pub interview: Option<InterviewCursor>,
}

impl StateUpdate {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
            && self.queries.is_empty()
            && self.questions.is_empty()
            && self.answers.is_empty()
            && self.segment.is_none()
            && self.phase.is_none()
            && self.rules.is_none()
            && self.interview.is_none()
    }

    pub fn append_message(mut self, turn: Turn) -> Self {
        self.messages.append.push(turn);
        self
    }

    pub fn append_messages(mut self, turns: impl IntoIterator<Item = Turn>) -> Self {
        self.messages.append.extend(turns);
        self
    }

    pub fn append_query(mut self, turn: Turn) -> Self {
        self.queries.append.push(turn);
        self
    }

    pub fn append_queries(mut self, turns: impl IntoIterator<Item = Turn>) -> Self {
        self.queries.append.extend(turns);
        self
    }

    pub fn clear_queries(mut self) -> Self {
        self.queries.clear = true;
        self
    }

    pub fn replace_questions(mut self, questions: Vec<Question>) -> Self {
        self.questions = SequenceUpdate {
            clear: true,
            append: questions,
        };
        self
    }

    pub fn append_answer(mut self, answer: Answer) -> Self {
        self.answers.append.push(answer);
        self
    }

    pub fn clear_answers(mut self) -> Self {
        self.answers.clear = true;
        self
    }

    #[allow(dead_code)] // Used in tests
    pub fn with_segment(mut self, segment: Segment) -> Self {
        self.segment = Some(segment);
        self
    }

    #[allow(dead_code)] // Used in tests
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn with_rules(mut self, rules: InterviewRules) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn with_cursor(mut self, cursor: InterviewCursor) -> Self {
        self.interview = Some(cursor);
        self
    }
}
