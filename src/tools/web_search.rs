//! web_search tool - Tavily web search

use std::time::Duration;

use async_trait::async_trait;
use eyre::WrapErr;
use log::debug;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Tool, ToolContext, ToolError, ToolOutput, parse_input, truncate};

const TAVILY_URL: &str = "https://api.tavily.com/search";

/// Search the live web for current events and recent information
pub struct WebSearchTool {
    client: reqwest::Client,
    api_key: String,
    max_results: usize,
    snippet_chars: usize,
}

#[derive(Debug, Deserialize)]
struct WebSearchArgs {
    query: String,
}

impl WebSearchTool {
    pub fn new(api_key: String, max_results: usize, snippet_chars: usize, timeout: Duration) -> eyre::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .wrap_err("failed to build web search HTTP client")?;

        Ok(Self {
            client,
            api_key,
            max_results,
            snippet_chars,
        })
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &'static str {
        "web_search"
    }

    fn description(&self) -> &'static str {
        "Search the web for current events, news and recent information that is not in the internal documents."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> Result<ToolOutput, eyre::Error> {
        let args: WebSearchArgs = parse_input(input)?;
        if args.query.trim().is_empty() {
            return Err(ToolError::InvalidInput {
                message: "query must not be empty".to_string(),
            }
            .into());
        }

        debug!("web_search: query={:?} max_results={}", args.query, self.max_results);

        let body = json!({
            "api_key": self.api_key,
            "query": args.query,
            "max_results": self.max_results,
            "search_depth": "basic"
        });

        let response = self
            .client
            .post(TAVILY_URL)
            .json(&body)
            .send()
            .await
            .wrap_err("search request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            eyre::bail!("Tavily API error {}: {}", status, error_text);
        }

        let result: Value = response.json().await.wrap_err("failed to parse Tavily response")?;

        Ok(ToolOutput::success(format_results(
            &args.query,
            &result,
            self.max_results,
            self.snippet_chars,
        )))
    }
}

/// Render a Tavily response as a numbered digest
fn format_results(query: &str, result: &Value, max_results: usize, snippet_chars: usize) -> String {
    let results = result["results"].as_array().map(Vec::as_slice).unwrap_or_default();

    if results.is_empty() {
        return format!("No results found for: {}", query);
    }

    let output: Vec<String> = results
        .iter()
        .take(max_results)
        .enumerate()
        .map(|(i, r)| {
            let title = r["title"].as_str().unwrap_or("(no title)");
            let url = r["url"].as_str().unwrap_or("");
            let content = r["content"].as_str().unwrap_or("");
            format!("{}. {}\n   {}\n   {}\n", i + 1, title, url, truncate(content, snippet_chars))
        })
        .collect();

    output.join("\n")
}
