//! Runtime for executing agent graphs
//!
//! [`GraphRuntime`] drives one agent over one storage backend;
//! [`RuntimeManager`] hosts the three agents the server exposes, each with
//! its own checkpointer.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{GraphRuntime, Invocation, Outcome, RuntimeError};
pub use traits::*;

use crate::agents::{AgentKind, ChatAgent, InterviewAgent, NewsAgent};
use crate::config::InterviewCatalog;
use crate::db::{ThreadRecord, ThreadSummary};
use std::path::PathBuf;
use std::sync::Arc;

struct Hosted<A, L, T>
where
    L: LlmClient + 'static,
    T: ToolExecutor + 'static,
{
    agent: A,
    runtime: GraphRuntime<Arc<dyn Checkpointer>, L, T>,
}

/// Manager for all agent runtimes
pub struct RuntimeManager<L = RegistryLlmClient, T = ToolRegistryExecutor>
where
    L: LlmClient + 'static,
    T: ToolExecutor + 'static,
{
    chat: Hosted<ChatAgent, L, T>,
    news: Hosted<NewsAgent, L, T>,
    interview: Hosted<InterviewAgent, L, T>,
}

impl<L, T> RuntimeManager<L, T>
where
    L: LlmClient + 'static,
    T: ToolExecutor + 'static,
{
    /// `store_for` picks the checkpointer of each agent
    pub fn new(
        llm: Arc<L>,
        tools: Arc<T>,
        output_dir: PathBuf,
        catalog: InterviewCatalog,
        store_for: impl Fn(AgentKind) -> Arc<dyn Checkpointer>,
    ) -> Self {
        let runtime = |kind| GraphRuntime::new(store_for(kind), llm.clone(), tools.clone(), output_dir.clone());
        Self {
            chat: Hosted {
                agent: ChatAgent,
                runtime: runtime(AgentKind::Chat),
            },
            news: Hosted {
                agent: NewsAgent,
                runtime: runtime(AgentKind::News),
            },
            interview: Hosted {
                agent: InterviewAgent::new(catalog),
                runtime: runtime(AgentKind::Interview),
            },
        }
    }

    pub fn interview_catalog(&self) -> &InterviewCatalog {
        self.interview.agent.catalog()
    }

    pub async fn invoke(
        &self,
        kind: AgentKind,
        thread_id: &str,
        invocation: Invocation,
    ) -> Result<Outcome, RuntimeError> {
        match kind {
            AgentKind::Chat => {
                self.chat
                    .runtime
                    .invoke(&self.chat.agent, thread_id, invocation)
                    .await
            }
            AgentKind::News => {
                self.news
                    .runtime
                    .invoke(&self.news.agent, thread_id, invocation)
                    .await
            }
            AgentKind::Interview => {
                self.interview
                    .runtime
                    .invoke(&self.interview.agent, thread_id, invocation)
                    .await
            }
        }
    }

    fn runtime(&self, kind: AgentKind) -> &GraphRuntime<Arc<dyn Checkpointer>, L, T> {
        match kind {
            AgentKind::Chat => &self.chat.runtime,
            AgentKind::News => &self.news.runtime,
            AgentKind::Interview => &self.interview.runtime,
        }
    }

    pub async fn thread(&self, kind: AgentKind, thread_id: &str) -> Result<ThreadRecord, RuntimeError> {
        self.runtime(kind).thread(kind.as_str(), thread_id).await
    }

    pub async fn delete_thread(&self, kind: AgentKind, thread_id: &str) -> Result<bool, RuntimeError> {
        self.runtime(kind).delete_thread(kind.as_str(), thread_id).await
    }

    pub async fn list_threads(&self, kind: AgentKind) -> Result<Vec<ThreadSummary>, RuntimeError> {
        self.runtime(kind).list_threads(kind.as_str()).await
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{MockLlmClient, MockToolExecutor};
    use super::*;
    use crate::conversation::{StateUpdate, Turn};
    use crate::db::Database;
    use serde_json::json;

    fn manager(llm: Arc<MockLlmClient>) -> RuntimeManager<MockLlmClient, MockToolExecutor> {
        let db = Database::open_in_memory().unwrap();
        let database: Arc<dyn Checkpointer> = Arc::new(DatabaseCheckpointer::new(db));
        RuntimeManager::new(
            llm,
            Arc::new(MockToolExecutor::new()),
            PathBuf::from("/tmp"),
            InterviewCatalog::default(),
            move |kind| -> Arc<dyn Checkpointer> {
                match kind {
                    AgentKind::Chat => database.clone(),
                    AgentKind::News | AgentKind::Interview => Arc::new(MemoryCheckpointer::new()),
                }
            },
        )
    }

    fn say(text: &str) -> Invocation {
        Invocation::Start(StateUpdate::default().append_message(Turn::user(text)))
    }

    #[tokio::test]
    async fn test_agents_have_separate_threads() {
        let llm = Arc::new(MockLlmClient::new("mock"));
        llm.queue_text("chat reply");
        llm.queue_text("news reply");
        let manager = manager(llm);

        manager.invoke(AgentKind::Chat, "t1", say("hi")).await.unwrap();
        manager.invoke(AgentKind::News, "t1", say("any news?")).await.unwrap();

        let chat = manager.thread(AgentKind::Chat, "t1").await.unwrap();
        let news = manager.thread(AgentKind::News, "t1").await.unwrap();
        assert_eq!(chat.state.messages[1], Turn::assistant("chat reply"));
        assert_eq!(news.state.messages[1], Turn::assistant("news reply"));
        assert!(manager.thread(AgentKind::Interview, "t1").await.unwrap().state.is_empty());
    }

    #[tokio::test]
    async fn test_interview_suspends_through_manager() {
        let manager = manager(Arc::new(MockLlmClient::new("mock")));

        let outcome = manager
            .invoke(AgentKind::Interview, "t9", Invocation::Start(StateUpdate::default()))
            .await
            .unwrap();
        assert_eq!(outcome.prompt(), Some(&json!("Please enter your full name")));

        let summaries = manager.list_threads(AgentKind::Interview).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].awaiting_input);
    }

    #[tokio::test]
    async fn test_delete_thread() {
        let llm = Arc::new(MockLlmClient::new("mock"));
        llm.queue_text("reply");
        let manager = manager(llm);

        manager.invoke(AgentKind::Chat, "t1", say("hi")).await.unwrap();
        assert!(manager.delete_thread(AgentKind::Chat, "t1").await.unwrap());
        assert!(!manager.delete_thread(AgentKind::Chat, "t1").await.unwrap());
        assert!(manager.list_threads(AgentKind::Chat).await.unwrap().is_empty());
    }
}
