//! PDF export tool - renders an HTML template through an external renderer
//!
//! The renderer is a command template such as `weasyprint - {output}`; the
//! HTML is piped to its stdin and `{output}` is replaced with the target path.

use super::{FileArtifact, Tool, ToolContext, ToolError, ToolValue};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const RENDER_TIMEOUT: Duration = Duration::from_secs(120);

const DESCRIPTION: &str = "Create a professional PDF document from an HTML template. \
Use only when the user explicitly asks to generate, create or export a PDF report or document. \
Before calling, gather the relevant information from the conversation and write a complete, \
self-contained HTML document (inline CSS or <style> blocks) with a title, the date of creation and \
a clear structure of headings, paragraphs and lists. When the data is quantitative, include charts \
or images that visualize it.";

#[derive(Debug, Deserialize)]
struct PdfInput {
    template: String,
}

pub struct PdfExportTool {
    renderer: String,
    timeout: Duration,
}

impl PdfExportTool {
    pub fn new(renderer: impl Into<String>) -> Self {
        Self {
            renderer: renderer.into(),
            timeout: RENDER_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn command_for(&self, output: &Path) -> Result<Command, ToolError> {
        let output = output.display().to_string();
        let mut parts = self.renderer.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| ToolError::Failed("PDF renderer is not configured".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(parts.map(|arg| arg.replace("{output}", &output)))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Ok(cmd)
    }

    async fn render(&self, html: &str, output: &Path) -> Result<(), ToolError> {
        let mut child = self
            .command_for(output)?
            .spawn()
            .map_err(|e| ToolError::Failed(format!("Failed to start PDF renderer: {e}")))?;

        // The deadline covers feeding stdin too: a renderer that never reads
        // would otherwise block the write once the pipe buffer fills. On
        // timeout the child is dropped and killed.
        let stdin = child.stdin.take();
        let conversion = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(html.as_bytes()).await?;
                // Dropping stdin closes the pipe so the renderer sees EOF
            }
            child.wait_with_output().await
        };

        let result = tokio::time::timeout(self.timeout, conversion)
            .await
            .map_err(|_| ToolError::Failed("PDF renderer timed out".to_string()))??;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ToolError::Failed(format!(
                "PDF renderer exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Tool for PdfExportTool {
    fn name(&self) -> &'static str {
        "generate_pdf_file"
    }

    fn description(&self) -> String {
        DESCRIPTION.to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["template"],
            "properties": {
                "template": {
                    "type": "string",
                    "description": "Complete, self-contained HTML document to render as the PDF"
                }
            }
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> Result<ToolValue, ToolError> {
        let input: PdfInput =
            serde_json::from_value(input).map_err(|e| ToolError::InvalidInput(e.to_string()))?;

        tokio::fs::create_dir_all(&ctx.output_dir).await?;
        let path = ctx.artifact_path("pdf");
        self.render(&input.template, &path).await?;

        tracing::info!(path = %path.display(), "Rendered PDF file");

        ToolValue::structured(FileArtifact {
            label: "Download PDF File",
            file_path: path.display().to_string(),
            file_name: "data.pdf",
            mime: "application/pdf",
        })
    }
}
