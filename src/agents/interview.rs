//! Interview simulator
//!
//! ```text
//! phase=execution:
//!   Perception → CandidateInfo → Questions ⇄ Tools → Answers → Evaluation → End
//! phase=reporting:
//!   Report ⇄ Tools → End
//! ```
//!
//! `CandidateInfo` and `Answers` suspend for caller input; their progress is
//! kept in the persisted [`InterviewCursor`] and `answers`, so a resumed node
//! picks up exactly where it stopped.

mod schema;
mod sequencer;

pub use sequencer::InterviewCursor;

use super::{build_request, parse_structured, response_turn};
use crate::config::InterviewCatalog;
use crate::conversation::{ConversationState, Phase, StateUpdate};
use crate::routing::{needs_tools, phase_entry, Branch};
use crate::runtime::{Agent, NodeContext, NodeOutput, Next, RuntimeError};
use crate::system_prompt::{interview_prompt, report_prompt};
use crate::tools::{run_pending_tools, ToolChannel};
use async_trait::async_trait;
use schema::{
    evaluation_format, questions_format, EvaluationSchema, QuestionsSchema, EVALUATION_SCHEMA,
    QUESTIONS_SCHEMA,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sequencer::{collect_answer, collect_candidate, InterviewStage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewNode {
    Perception,
    CandidateInfo,
    Questions,
    Tools,
    Answers,
    Evaluation,
    Report,
}

#[derive(Debug, Default)]
pub struct InterviewAgent {
    catalog: InterviewCatalog,
}

impl InterviewAgent {
    pub fn new(catalog: InterviewCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &InterviewCatalog {
        &self.catalog
    }

    /// Resolve the rules and forget any earlier interview on this thread
    fn perceive(&self, state: &ConversationState) -> StateUpdate {
        let rules = self.catalog.resolve(state.rules.as_ref());
        tracing::debug!(
            format = %rules.format,
            time_frame = rules.time_frame,
            no_of_questions = rules.no_of_questions,
            "Starting interview"
        );
        StateUpdate::default()
            .with_rules(rules.into())
            .replace_questions(Vec::new())
            .clear_answers()
            .with_cursor(InterviewCursor::default())
    }

    fn system_prompt(&self, state: &ConversationState) -> Result<String, RuntimeError> {
        let cursor = state.interview.clone().unwrap_or_default();
        let candidate = cursor
            .candidate
            .complete()
            .ok_or_else(|| RuntimeError::InvalidState("candidate details not collected".into()))?;
        let rules = self.catalog.resolve(state.rules.as_ref());
        Ok(interview_prompt(
            &candidate.role,
            &candidate.companies,
            rules.time_frame,
            rules.no_of_questions,
        ))
    }

    async fn generate_questions(
        &self,
        state: &ConversationState,
        ctx: &NodeContext<'_>,
    ) -> Result<StateUpdate, RuntimeError> {
        let request = build_request(
            &self.system_prompt(state)?,
            &state.messages,
            ctx.tools.definitions(),
            Some(questions_format()),
        );
        let response = ctx.llm.complete(&request).await?;
        if response.has_tool_use() {
            return Ok(StateUpdate::default().append_message(response_turn(&response)));
        }

        let parsed = parse_structured::<QuestionsSchema>(&response, QUESTIONS_SCHEMA)?;
        let cursor = state.interview.clone().unwrap_or_default();
        tracing::info!(thread_id = ctx.thread_id, count = parsed.value.questions.len(), "Generated questions");
        Ok(StateUpdate::default()
            .append_message(parsed.turn)
            .replace_questions(parsed.value.questions)
            .with_cursor(cursor.at(InterviewStage::Answers)))
    }

    async fn evaluate(&self, state: &ConversationState, ctx: &NodeContext<'_>) -> Result<StateUpdate, RuntimeError> {
        let request = build_request(
            &self.system_prompt(state)?,
            &state.messages,
            Vec::new(),
            Some(evaluation_format()),
        );
        let response = ctx.llm.complete(&request).await?;
        let parsed = parse_structured::<EvaluationSchema>(&response, EVALUATION_SCHEMA)?;
        let cursor = state.interview.clone().unwrap_or_default();
        Ok(StateUpdate::default()
            .append_message(parsed.turn)
            .with_cursor(cursor.at(InterviewStage::Complete)))
    }

    async fn report(state: &ConversationState, ctx: &NodeContext<'_>) -> Result<StateUpdate, RuntimeError> {
        let request = build_request(report_prompt(), &state.messages, ctx.tools.definitions(), None);
        let response = ctx.llm.complete(&request).await?;
        Ok(StateUpdate::default().append_message(response_turn(&response)))
    }
}

#[async_trait]
impl Agent for InterviewAgent {
    type Node = InterviewNode;

    fn name(&self) -> &'static str {
        "interview"
    }

    fn entry(&self, state: &ConversationState) -> InterviewNode {
        phase_entry(state)
    }

    async fn run_node(
        &self,
        node: InterviewNode,
        state: &ConversationState,
        reply: Option<Value>,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, RuntimeError> {
        let cursor = state.interview.clone().unwrap_or_default();
        let update = match node {
            InterviewNode::Perception => self.perceive(state),
            InterviewNode::CandidateInfo => return collect_candidate(&cursor, reply),
            InterviewNode::Questions => self.generate_questions(state, ctx).await?,
            InterviewNode::Tools => {
                run_pending_tools(state, ToolChannel::Messages, ctx.tools, &ctx.tool_ctx).await?
            }
            InterviewNode::Answers => {
                return collect_answer(&cursor, &state.questions, &state.answers, reply)
            }
            InterviewNode::Evaluation => self.evaluate(state, ctx).await?,
            InterviewNode::Report => Self::report(state, ctx).await?,
        };
        Ok(NodeOutput::Continue(update))
    }

    fn next(&self, from: InterviewNode, state: &ConversationState) -> Next<InterviewNode> {
        match from {
            InterviewNode::Perception => Next::Node(InterviewNode::CandidateInfo),
            InterviewNode::CandidateInfo => Next::Node(InterviewNode::Questions),
            InterviewNode::Questions => match needs_tools(state) {
                Branch::Tools => Next::Node(InterviewNode::Tools),
                Branch::End => Next::Node(InterviewNode::Answers),
            },
            InterviewNode::Tools => match state.phase() {
                Phase::Execution => Next::Node(InterviewNode::Questions),
                Phase::Reporting => Next::Node(InterviewNode::Report),
            },
            InterviewNode::Answers => Next::Node(InterviewNode::Evaluation),
            InterviewNode::Evaluation => Next::End,
            InterviewNode::Report => match needs_tools(state) {
                Branch::Tools => Next::Node(InterviewNode::Tools),
                Branch::End => Next::End,
            },
        }
    }
}
