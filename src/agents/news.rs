//! News research agent
//!
//! ```text
//! Perception ─route─▶ Headlines | Stories | Query ─needs_tools─▶ Tools | End
//! Tools ─▶ Perception
//! ```
//!
//! Summaries and follow-up questions run in the private `queries`
//! sub-conversation. `queries` is either empty or starts with the latest
//! summary request taken from `messages`; the final answer to that request
//! is mirrored back into `messages`.

use super::{build_request, parse_structured, response_turn};
use crate::conversation::{ConversationState, StateUpdate, Turn};
use crate::llm::ResponseFormat;
use crate::routing::{needs_tools_in, route, Branch};
use crate::runtime::{Agent, NodeContext, NodeOutput, Next, RuntimeError};
use crate::system_prompt::{news_prompt, NewsPersona};
use crate::tools::{run_pending_tools, ToolChannel};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsNode {
    Perception,
    Headlines,
    Stories,
    Query,
    Tools,
}

/// One news headline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    /// Where the event took place
    pub location: String,
    pub text: String,
    /// Human-readable date and time of the event
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadlinesSchema {
    pub headlines: Vec<Headline>,
}

/// One article related to a selected headline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub source: String,
    pub text: String,
    /// Link to the full story
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoriesSchema {
    pub stories: Vec<Story>,
}

const HEADLINES_SCHEMA: &str = "HeadlinesSchema";
const STORIES_SCHEMA: &str = "StoriesSchema";

fn headlines_format() -> ResponseFormat {
    ResponseFormat::json_schema(
        HEADLINES_SCHEMA,
        json!({
            "type": "object",
            "properties": {
                "headlines": {
                    "type": "array",
                    "description": "List of news headlines",
                    "items": {
                        "type": "object",
                        "properties": {
                            "location": {"type": "string", "description": "Where the event of the headline took place"},
                            "text": {"type": "string", "description": "Text of the headline"},
                            "date": {"type": "string", "description": "Human-readable date and time of the event"}
                        },
                        "required": ["location", "text", "date"]
                    }
                }
            },
            "required": ["headlines"]
        }),
    )
}

fn stories_format() -> ResponseFormat {
    ResponseFormat::json_schema(
        STORIES_SCHEMA,
        json!({
            "type": "object",
            "properties": {
                "stories": {
                    "type": "array",
                    "description": "Articles related to the selected headline",
                    "items": {
                        "type": "object",
                        "properties": {
                            "source": {"type": "string", "description": "Name of the article's source"},
                            "text": {"type": "string", "description": "Text or content of the article"},
                            "link": {"type": "string", "description": "http(s) link to the full story"}
                        },
                        "required": ["source", "text", "link"]
                    }
                }
            },
            "required": ["stories"]
        }),
    )
}

/// Whether `queries` holds an unfinished exchange for the latest request
fn summary_in_progress(state: &ConversationState) -> bool {
    let seeded = state.queries.first().is_some() && state.queries.first() == state.last_message();
    let answered = matches!(
        state.last_query(),
        Some(Turn::Assistant { tool_calls, .. }) if tool_calls.is_empty()
    );
    seeded && !answered
}

const ABANDONED_TOOL_CALL: &str = "Error: the tool call did not complete";

/// Sequence the current request works in
fn active_channel(state: &ConversationState) -> ToolChannel {
    if route(state) == NewsNode::Query && !state.queries.is_empty() {
        ToolChannel::Queries
    } else {
        ToolChannel::Messages
    }
}

/// Perception only runs at entry or after the tools node succeeded, so calls
/// still pending in `queries` here belong to a run whose tools failed.
fn close_abandoned_queries(state: &ConversationState) -> StateUpdate {
    let calls = state.last_query().map_or(&[][..], Turn::pending_tool_calls);
    StateUpdate::default().append_queries(
        calls
            .iter()
            .map(|call| Turn::tool_result(call.id.clone(), ABANDONED_TOOL_CALL)),
    )
}

fn perceive(state: &ConversationState) -> StateUpdate {
    if route(state) != NewsNode::Query || summary_in_progress(state) {
        return close_abandoned_queries(state);
    }
    match state.last_message() {
        Some(request @ Turn::User { .. }) => StateUpdate::default()
            .clear_queries()
            .append_query(request.clone()),
        _ => close_abandoned_queries(state),
    }
}

#[derive(Debug, Default)]
pub struct NewsAgent;

impl NewsAgent {
    async fn structured_segment<T>(
        state: &ConversationState,
        ctx: &NodeContext<'_>,
        persona: NewsPersona,
        schema: &'static str,
        format: ResponseFormat,
    ) -> Result<StateUpdate, RuntimeError>
    where
        T: DeserializeOwned + Serialize,
    {
        let request = build_request(
            &news_prompt(persona, chrono::Local::now()),
            &state.messages,
            ctx.tools.definitions(),
            Some(format),
        );
        let response = ctx.llm.complete(&request).await?;

        if response.has_tool_use() {
            return Ok(StateUpdate::default().append_message(response_turn(&response)));
        }
        let parsed = parse_structured::<T>(&response, schema)?;
        Ok(StateUpdate::default().append_message(parsed.turn))
    }

    async fn query(state: &ConversationState, ctx: &NodeContext<'_>) -> Result<StateUpdate, RuntimeError> {
        let prompt = news_prompt(NewsPersona::Anchor, chrono::Local::now());

        if state.queries.is_empty() {
            let request = build_request(&prompt, &state.messages, ctx.tools.definitions(), None);
            let response = ctx.llm.complete(&request).await?;
            return Ok(StateUpdate::default().append_message(response_turn(&response)));
        }

        let request = build_request(&prompt, &state.queries, ctx.tools.definitions(), None);
        let response = ctx.llm.complete(&request).await?;
        let turn = response_turn(&response);

        let mirror = summary_in_progress(state) && !turn.has_pending_tool_calls();
        let update = StateUpdate::default().append_query(turn.clone());
        Ok(if mirror {
            update.append_message(turn)
        } else {
            update
        })
    }
}

#[async_trait]
impl Agent for NewsAgent {
    type Node = NewsNode;

    fn name(&self) -> &'static str {
        "news"
    }

    fn entry(&self, _state: &ConversationState) -> NewsNode {
        NewsNode::Perception
    }

    async fn run_node(
        &self,
        node: NewsNode,
        state: &ConversationState,
        _reply: Option<Value>,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, RuntimeError> {
        let update = match node {
            NewsNode::Perception => perceive(state),
            NewsNode::Headlines => {
                Self::structured_segment::<HeadlinesSchema>(
                    state,
                    ctx,
                    NewsPersona::Reporter,
                    HEADLINES_SCHEMA,
                    headlines_format(),
                )
                .await?
            }
            NewsNode::Stories => {
                Self::structured_segment::<StoriesSchema>(
                    state,
                    ctx,
                    NewsPersona::Journalist,
                    STORIES_SCHEMA,
                    stories_format(),
                )
                .await?
            }
            NewsNode::Query => Self::query(state, ctx).await?,
            NewsNode::Tools => {
                run_pending_tools(state, active_channel(state), ctx.tools, &ctx.tool_ctx).await?
            }
        };
        Ok(NodeOutput::Continue(update))
    }

    fn next(&self, from: NewsNode, state: &ConversationState) -> Next<NewsNode> {
        match from {
            NewsNode::Perception => Next::Node(route(state)),
            NewsNode::Headlines | NewsNode::Stories | NewsNode::Query => {
                match needs_tools_in(active_channel(state).turns(state)) {
                    Branch::Tools => Next::Node(NewsNode::Tools),
                    Branch::End => Next::End,
                }
            }
            NewsNode::Tools => Next::Node(NewsNode::Perception),
        }
    }
}
