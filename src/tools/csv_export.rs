//! CSV export tool - writes column-oriented data to a CSV file

use super::{FileArtifact, Tool, ToolContext, ToolError, ToolValue};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

const DESCRIPTION: &str = "Generate a CSV file from data gathered in the conversation. \
Use only when the user explicitly asks to export, compile or generate structured data as a file. \
Before calling, extract the relevant data points from the conversation and arrange them as an object \
whose keys are the column headers (e.g. 'Project Name', 'Status', 'Metric Value') and whose values are \
lists of that column's data points. All lists must have equal length so that they form coherent rows, \
e.g. {\"Topic\": [\"Apples\", \"Bananas\"], \"Price\": [1.0, 0.5]}. Keep the data clean and consistent.";

#[derive(Debug, Deserialize)]
struct CsvInput {
    data: Map<String, Value>,
}

pub struct CsvExportTool;

/// Render column-oriented data as CSV text, columns in key order
fn render_csv(data: &Map<String, Value>) -> Result<String, ToolError> {
    if data.is_empty() {
        return Err(ToolError::InvalidInput("data has no columns".to_string()));
    }

    let mut columns = Vec::with_capacity(data.len());
    for (header, values) in data {
        let values = values
            .as_array()
            .ok_or_else(|| ToolError::InvalidInput(format!("column '{header}' is not a list")))?;
        columns.push((header.as_str(), values));
    }

    let rows = columns[0].1.len();
    if let Some((header, values)) = columns.iter().find(|(_, v)| v.len() != rows) {
        return Err(ToolError::InvalidInput(format!(
            "column '{header}' has {} values, expected {rows}",
            values.len()
        )));
    }

    let mut out = String::new();
    let headers: Vec<String> = columns.iter().map(|(h, _)| escape_field(h)).collect();
    out.push_str(&headers.join(","));
    out.push('\n');

    for row in 0..rows {
        let fields: Vec<String> = columns
            .iter()
            .map(|(_, values)| escape_field(&cell_text(&values[row])))
            .collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }

    Ok(out)
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Quote a field when it contains a delimiter, quote or line break
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[async_trait]
impl Tool for CsvExportTool {
    fn name(&self) -> &'static str {
        "generate_csv_file"
    }

    fn description(&self) -> String {
        DESCRIPTION.to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["data"],
            "properties": {
                "data": {
                    "type": "object",
                    "description": "Column header to list of that column's values; all lists equal length",
                    "additionalProperties": {"type": "array", "items": {}}
                }
            }
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> Result<ToolValue, ToolError> {
        let input: CsvInput =
            serde_json::from_value(input).map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        let csv = render_csv(&input.data)?;

        tokio::fs::create_dir_all(&ctx.output_dir).await?;
        let path = ctx.artifact_path("csv");
        tokio::fs::write(&path, csv).await?;

        tracing::info!(path = %path.display(), columns = input.data.len(), "Wrote CSV file");

        ToolValue::structured(FileArtifact {
            label: "Download CSV File",
            file_path: path.display().to_string(),
            file_name: "data.csv",
            mime: "text/csv",
        })
    }
}
