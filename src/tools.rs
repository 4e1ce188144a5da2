//! Tool implementations shared by the agents
//!
//! Tools are stateless singletons; all per-call context arrives through
//! [`ToolContext`].

mod csv_export;
pub mod dispatch;
mod pdf_export;
mod search;

pub use csv_export::CsvExportTool;
pub use dispatch::{run_pending_tools, ToolChannel};
pub use pdf_export::PdfExportTool;
pub use search::SearchTool;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Value returned by a tool
#[derive(Debug, Clone, PartialEq)]
pub enum ToolValue {
    /// Plain text, passed to the model verbatim
    Text(String),
    /// A map or list, passed to the model as indented JSON
    Structured(Value),
}

impl ToolValue {
    pub fn structured(value: impl Serialize) -> Result<Self, ToolError> {
        serde_json::to_value(value)
            .map(Self::Structured)
            .map_err(|e| ToolError::Failed(format!("Failed to serialize result: {e}")))
    }

    /// Render as the content of a tool-result turn
    pub fn into_content(self) -> String {
        match self {
            ToolValue::Text(text) => text,
            ToolValue::Structured(value) => {
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

/// Tool failure
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("{0}")]
    Failed(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Descriptor returned by the file-producing tools
#[derive(Debug, Clone, Serialize)]
pub struct FileArtifact {
    pub label: &'static str,
    pub file_path: String,
    pub file_name: &'static str,
    pub mime: &'static str,
}

/// All context needed for a tool invocation
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// The thread this tool is executing within
    pub thread_id: String,

    /// Directory that file-producing tools write into
    pub output_dir: PathBuf,
}

impl ToolContext {
    pub fn new(thread_id: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            thread_id: thread_id.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Unique artifact path inside the output directory
    pub fn artifact_path(&self, extension: &str) -> PathBuf {
        self.output_dir.join(format!(
            "{}-{}.{extension}",
            self.thread_id,
            uuid::Uuid::new_v4().simple()
        ))
    }
}

/// Trait for tools that can be bound to a model
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name
    fn name(&self) -> &str;

    /// Tool description for LLM
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    async fn run(&self, input: Value, ctx: ToolContext) -> Result<ToolValue, ToolError>;
}

/// Collection of tools bound to every agent
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// The standard set: web search, CSV export and PDF export
    pub fn standard(pdf_renderer: impl Into<String>) -> Self {
        Self::with_tools(vec![
            Arc::new(SearchTool::default()),
            Arc::new(CsvExportTool),
            Arc::new(PdfExportTool::new(pdf_renderer)),
        ])
    }

    pub fn with_tools(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { tools }
    }

    /// Get all tool definitions for LLM
    pub fn definitions(&self) -> Vec<crate::llm::ToolDefinition> {
        self.tools
            .iter()
            .map(|t| crate::llm::ToolDefinition {
                name: t.name().to_string(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Execute a tool by name; `None` when no tool has that name
    pub async fn execute(
        &self,
        name: &str,
        input: Value,
        ctx: ToolContext,
    ) -> Option<Result<ToolValue, ToolError>> {
        let tool = self.tools.iter().find(|t| t.name() == name)?;
        tracing::info!(tool = name, thread_id = %ctx.thread_id, "Running tool");
        Some(tool.run(input, ctx).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_standard_tools_registered() {
        let registry = ToolRegistry::standard("weasyprint - {output}");
        let names: Vec<_> = registry
            .definitions()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(
            names,
            vec!["search_internet", "generate_csv_file", "generate_pdf_file"]
        );
    }

    #[test]
    fn test_structured_value_is_indented_json() {
        let value = ToolValue::Structured(json!({"a": [1, 2]}));
        assert_eq!(
            value.into_content(),
            "{\n  \"a\": [\n    1,\n    2\n  ]\n}"
        );
        assert_eq!(ToolValue::Text("plain".into()).into_content(), "plain");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_none() {
        let registry = ToolRegistry::with_tools(vec![]);
        let result = registry
            .execute("nope", json!({}), ToolContext::new("t", "/tmp"))
            .await;
        assert!(result.is_none());
    }
}
