//! Conversational agents hosted by the server
//!
//! Each agent is a small graph over [`ConversationState`](crate::conversation::ConversationState)
//! run by [`GraphRuntime`](crate::runtime::GraphRuntime).

pub mod chat;
pub mod interview;
pub mod news;

pub use chat::ChatAgent;
pub use interview::InterviewAgent;
pub use news::NewsAgent;

use crate::conversation::{ToolCall, Turn};
use crate::llm::{
    ContentBlock, LlmMessage, LlmRequest, LlmResponse, MessageRole, ResponseFormat, SystemContent,
    ToolDefinition,
};
use crate::runtime::RuntimeError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upper bound on tokens for a single model reply
const MAX_REPLY_TOKENS: u32 = 8192;

/// The agents this server hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Chat,
    News,
    Interview,
}

impl AgentKind {
    pub const ALL: [AgentKind; 3] = [AgentKind::Chat, AgentKind::News, AgentKind::Interview];

    pub fn as_str(self) -> &'static str {
        match self {
            AgentKind::Chat => "chat",
            AgentKind::News => "news",
            AgentKind::Interview => "interview",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" | "chatbot" => Ok(AgentKind::Chat),
            "news" | "newsbot" => Ok(AgentKind::News),
            "interview" | "interviewbot" => Ok(AgentKind::Interview),
            other => Err(format!("Unknown agent: {other}")),
        }
    }
}

/// Translate conversation turns into provider messages.
///
/// System turns become extra system content; consecutive tool results are
/// merged into one user message.
fn translate_turns(turns: &[Turn]) -> (Vec<SystemContent>, Vec<LlmMessage>) {
    let mut system = Vec::new();
    let mut messages: Vec<LlmMessage> = Vec::new();

    for turn in turns {
        match turn {
            Turn::System { text } => system.push(SystemContent::new(text.clone())),
            Turn::User { text } => messages.push(LlmMessage {
                role: MessageRole::User,
                content: vec![ContentBlock::text(text.clone())],
            }),
            Turn::Assistant { text, tool_calls } => {
                let mut content = Vec::with_capacity(tool_calls.len() + 1);
                if !text.is_empty() {
                    content.push(ContentBlock::text(text.clone()));
                }
                content.extend(
                    tool_calls
                        .iter()
                        .map(|c| ContentBlock::tool_use(c.id.clone(), c.name.clone(), c.args.clone())),
                );
                if content.is_empty() {
                    content.push(ContentBlock::text(String::new()));
                }
                messages.push(LlmMessage {
                    role: MessageRole::Assistant,
                    content,
                });
            }
            Turn::ToolResult { call_id, content } => {
                let block = ContentBlock::tool_result(call_id.clone(), content.clone(), false);
                match messages.last_mut() {
                    Some(last)
                        if last.role == MessageRole::User
                            && last
                                .content
                                .iter()
                                .all(|b| matches!(b, ContentBlock::ToolResult { .. })) =>
                    {
                        last.content.push(block);
                    }
                    _ => messages.push(LlmMessage {
                        role: MessageRole::User,
                        content: vec![block],
                    }),
                }
            }
        }
    }

    (system, messages)
}

/// Build a model request with a system prompt spliced in front of `turns`
pub fn build_request(
    system_prompt: &str,
    turns: &[Turn],
    tools: Vec<ToolDefinition>,
    response_format: Option<ResponseFormat>,
) -> LlmRequest {
    let (extra_system, messages) = translate_turns(turns);
    let mut system = vec![SystemContent::new(system_prompt)];
    system.extend(extra_system);

    LlmRequest {
        system,
        messages,
        tools,
        max_tokens: Some(MAX_REPLY_TOKENS),
        response_format,
    }
}

/// Convert a model response into an assistant turn
pub fn response_turn(response: &LlmResponse) -> Turn {
    let calls: Vec<ToolCall> = response
        .tool_uses()
        .into_iter()
        .map(|(id, name, input)| ToolCall::new(id, name, input.clone()))
        .collect();
    Turn::assistant_with_calls(response.text(), calls)
}

/// A schema-constrained reply, parsed and re-rendered as indented JSON
#[derive(Debug)]
pub struct Structured<T> {
    pub value: T,
    pub turn: Turn,
}

/// Parse a structured reply; a mismatch is surfaced unmodified
pub fn parse_structured<T>(response: &LlmResponse, schema: &'static str) -> Result<Structured<T>, RuntimeError>
where
    T: DeserializeOwned + Serialize,
{
    let text = response.text();
    let body = strip_code_fence(&text);
    let value: T = serde_json::from_str(body).map_err(|e| RuntimeError::StructuredOutput {
        schema,
        message: e.to_string(),
    })?;
    let pretty = serde_json::to_string_pretty(&value)?;
    Ok(Structured {
        value,
        turn: Turn::assistant(pretty),
    })
}

/// Some providers wrap JSON output in a markdown fence
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map_or(trimmed, str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::tool_call_response;
    use serde_json::json;

    #[test]
    fn test_agent_kind_parse() {
        assert_eq!("news".parse::<AgentKind>(), Ok(AgentKind::News));
        assert_eq!("interviewbot".parse::<AgentKind>(), Ok(AgentKind::Interview));
        assert!("weather".parse::<AgentKind>().is_err());
        assert_eq!(AgentKind::Chat.to_string(), "chat");
    }

    #[test]
    fn test_build_request_splices_system_prompt() {
        let turns = vec![Turn::system("extra"), Turn::user("hello")];
        let request = build_request("You are helpful", &turns, vec![], None);

        assert_eq!(request.system.len(), 2);
        assert_eq!(request.system[0].text, "You are helpful");
        assert_eq!(request.system[1].text, "extra");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, MessageRole::User);
    }

    #[test]
    fn test_consecutive_tool_results_merge() {
        let turns = vec![
            Turn::user("q"),
            Turn::assistant_with_calls(
                "",
                vec![
                    ToolCall::new("a", "search_internet", json!({})),
                    ToolCall::new("b", "search_internet", json!({})),
                ],
            ),
            Turn::tool_result("a", "1"),
            Turn::tool_result("b", "2"),
            Turn::user("thanks"),
        ];
        let request = build_request("sys", &turns, vec![], None);

        assert_eq!(request.messages.len(), 4);
        assert_eq!(request.messages[1].content.len(), 2);
        assert_eq!(request.messages[2].content.len(), 2);
        assert_eq!(request.messages[3].content, vec![ContentBlock::text("thanks")]);
    }

    #[test]
    fn test_response_turn_keeps_tool_calls() {
        let response = tool_call_response(&[("c1", "search_internet", json!({"query": "x"}))]);
        let turn = response_turn(&response);
        assert!(turn.has_pending_tool_calls());
        assert_eq!(turn.pending_tool_calls()[0].id, "c1");
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Sample {
        items: Vec<String>,
    }

    #[test]
    fn test_parse_structured_pretty_prints() {
        let response = LlmResponse::from_text("```json\n{\"items\":[\"a\"]}\n```");
        let parsed: Structured<Sample> = parse_structured(&response, "Sample").unwrap();
        assert_eq!(parsed.value.items, vec!["a"]);
        assert_eq!(
            parsed.turn,
            Turn::assistant("{\n  \"items\": [\n    \"a\"\n  ]\n}")
        );
    }

    #[test]
    fn test_parse_structured_mismatch() {
        let response = LlmResponse::from_text("{\"wrong\": 1}");
        let err = parse_structured::<Sample>(&response, "Sample").unwrap_err();
        assert!(matches!(err, RuntimeError::StructuredOutput { schema: "Sample", .. }));
    }
}
