//! General-purpose chat agent: `Chat ⇄ Tools → End`

use super::{build_request, response_turn};
use crate::conversation::{ConversationState, StateUpdate};
use crate::routing::{needs_tools, Branch};
use crate::runtime::{Agent, NodeContext, NodeOutput, Next, RuntimeError};
use crate::system_prompt::chatbot_prompt;
use crate::tools::{run_pending_tools, ToolChannel};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatNode {
    Chat,
    Tools,
}

#[derive(Debug, Default)]
pub struct ChatAgent;

#[async_trait]
impl Agent for ChatAgent {
    type Node = ChatNode;

    fn name(&self) -> &'static str {
        "chat"
    }

    fn entry(&self, _state: &ConversationState) -> ChatNode {
        ChatNode::Chat
    }

    async fn run_node(
        &self,
        node: ChatNode,
        state: &ConversationState,
        _reply: Option<Value>,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, RuntimeError> {
        let update = match node {
            ChatNode::Chat => {
                let request = build_request(
                    &chatbot_prompt(chrono::Local::now()),
                    &state.messages,
                    ctx.tools.definitions(),
                    None,
                );
                let response = ctx.llm.complete(&request).await?;
                StateUpdate::default().append_message(response_turn(&response))
            }
            ChatNode::Tools => {
                run_pending_tools(state, ToolChannel::Messages, ctx.tools, &ctx.tool_ctx).await?
            }
        };
        Ok(NodeOutput::Continue(update))
    }

    fn next(&self, from: ChatNode, state: &ConversationState) -> Next<ChatNode> {
        match from {
            ChatNode::Chat => match needs_tools(state) {
                Branch::Tools => Next::Node(ChatNode::Tools),
                Branch::End => Next::End,
            },
            ChatNode::Tools => Next::Node(ChatNode::Chat),
        }
    }
}
