//! Web search tool backed by the DuckDuckGo HTML endpoint

use super::{Tool, ToolContext, ToolError, ToolValue};
use async_trait::async_trait;
use regex::{Captures, Regex};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::OnceLock;
use std::time::Duration;

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";
const DEFAULT_MAX_RESULTS: usize = 8;

static RESULT_LINK: OnceLock<Regex> = OnceLock::new();
static RESULT_SNIPPET: OnceLock<Regex> = OnceLock::new();
static TAG: OnceLock<Regex> = OnceLock::new();

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid regex {pattern:?}: {e}"))
}

/// Title link of one result: captures the href and the title markup
fn result_link() -> &'static Regex {
    RESULT_LINK.get_or_init(|| {
        compile(r#"(?s)<a[^>]*class="result__a"[^>]*href="([^"]*)"[^>]*>(.*?)</a>"#)
    })
}

fn result_snippet() -> &'static Regex {
    RESULT_SNIPPET.get_or_init(|| compile(r#"(?s)class="result__snippet"[^>]*>(.*?)</a>"#))
}

fn tag() -> &'static Regex {
    TAG.get_or_init(|| compile(r"<[^>]+>"))
}

#[derive(Debug, Deserialize)]
struct SearchInput {
    query: String,
    #[serde(default)]
    max_results: Option<usize>,
}

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

pub struct SearchTool {
    client: Client,
}

impl Default for SearchTool {
    fn default() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent("Mozilla/5.0 (compatible; parley)")
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl SearchTool {
    async fn search(&self, query: &str) -> Result<String, ToolError> {
        let response = self
            .client
            .get(SEARCH_URL)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| ToolError::Failed(format!("Search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Failed(format!("Search returned HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| ToolError::Failed(format!("Failed to read search response: {e}")))
    }
}

/// Extract results from a DuckDuckGo HTML results page.
///
/// A result's snippet is looked up between its link and the next result's
/// link; a result without one gets an empty snippet.
pub fn parse_results(html: &str, limit: usize) -> Vec<SearchResult> {
    let links: Vec<Captures<'_>> = result_link().captures_iter(html).collect();
    let block_ends = links
        .iter()
        .skip(1)
        .filter_map(|c| c.get(0))
        .map(|m| m.start())
        .chain(std::iter::once(html.len()));

    links
        .iter()
        .zip(block_ends)
        .take(limit)
        .map(|(c, end)| {
            let start = c.get(0).map_or(end, |m| m.end());
            let snippet = result_snippet()
                .captures(&html[start..end])
                .map(|s| clean_text(&s[1]))
                .unwrap_or_default();
            SearchResult {
                title: clean_text(&c[2]),
                link: resolve_link(&decode_entities(&c[1])),
                snippet,
            }
        })
        .collect()
}

/// Unwrap DuckDuckGo's redirect links (`//duckduckgo.com/l/?uddg=...`)
fn resolve_link(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    Url::parse(&absolute)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "uddg")
                .map(|(_, target)| target.into_owned())
        })
        .unwrap_or(absolute)
}

fn clean_text(fragment: &str) -> String {
    let stripped = tag().replace_all(fragment, "");
    decode_entities(stripped.trim())
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &'static str {
        "search_internet"
    }

    fn description(&self) -> String {
        "Search the internet for current information. Useful for news, recent events and \
         anything that may have changed since training. Input is a search query."
            .to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["query"],
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of results to return (default 8)"
                }
            }
        })
    }

    async fn run(&self, input: Value, _ctx: ToolContext) -> Result<ToolValue, ToolError> {
        let input: SearchInput =
            serde_json::from_value(input).map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        if input.query.trim().is_empty() {
            return Err(ToolError::InvalidInput("query is empty".to_string()));
        }

        let html = self.search(&input.query).await?;
        let results = parse_results(&html, input.max_results.unwrap_or(DEFAULT_MAX_RESULTS));
        tracing::debug!(query = %input.query, results = results.len(), "Search completed");

        if results.is_empty() {
            return Ok(ToolValue::Text("No good search results found.".to_string()));
        }
        ToolValue::structured(results)
    }
}
