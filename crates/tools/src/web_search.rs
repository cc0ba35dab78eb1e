//! Web search tool backed by a SearXNG instance.
//!
//! Runs each query in turn against `<searxng_url>/search?format=json`,
//! de-duplicates URLs across queries, and returns the hits as a
//! numbered block quote. Each hit is also sent to the host as a citation.
//! Per-query failures are reported inline so one bad query never sinks
//! the whole call.

use async_trait::async_trait;
use chatplug_config::LookupConfig;
use chatplug_core::error::ToolError;
use chatplug_core::event::HostEvent;
use chatplug_core::tool::{Tool, ToolContext, ToolResult};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

/// Results requested when the model does not say.
const DEFAULT_RESULTS_PER_QUERY: i64 = 3;

pub struct WebSearchTool {
    config: LookupConfig,
    client: reqwest::Client,
}

impl WebSearchTool {
    /// Create the tool with an HTTP client using the configured timeout.
    pub fn new(config: LookupConfig) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "web_search".into(),
                reason: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self::with_client(config, client))
    }

    /// Create the tool around an existing client.
    pub fn with_client(config: LookupConfig, client: reqwest::Client) -> Self {
        let config = LookupConfig {
            searxng_url: config.searxng_url.trim_end_matches('/').to_string(),
            ..config
        };
        Self { config, client }
    }

    async fn fetch(&self, query: &str) -> Result<serde_json::Value, reqwest::Error> {
        let url = format!("{}/search", self.config.searxng_url);
        let safesearch = u8::from(self.config.safesearch).to_string();
        self.client
            .get(&url)
            .query(&[("q", query), ("safesearch", safesearch.as_str()), ("format", "json")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[derive(Debug, Clone, Serialize)]
struct SearchHit {
    query: String,
    title: String,
    url: String,
    content: String,
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for a list of queries and return snippets, titles, and links. \
         Use several searches mixing natural-language questions and keyword queries, \
         rephrasing the prompt as little as possible. Issue the questions first, then the keyword \
         queries, with at least one of each. Use 3 to 8 results per query; more when more context is needed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "queries": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Search queries, questions first, then keyword queries"
                },
                "number_of_results_per_query": {
                    "type": "integer",
                    "description": "Results to return per query (1 to 8, default 3)",
                    "default": DEFAULT_RESULTS_PER_QUERY
                }
            },
            "required": ["queries"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let queries: Vec<String> = arguments
            .get("queries")
            .and_then(|q| serde_json::from_value(q.clone()).ok())
            .ok_or_else(|| {
                ToolError::InvalidArguments("'queries' must be an array of strings".into())
            })?;
        if queries.is_empty() {
            return Err(ToolError::InvalidArguments(
                "'queries' must contain at least one search query".into(),
            ));
        }

        let per_query = arguments["number_of_results_per_query"]
            .as_i64()
            .unwrap_or(DEFAULT_RESULTS_PER_QUERY)
            .clamp(1, i64::from(self.config.max_results_per_query)) as usize;

        let mut output = String::from("Success\n");

        ctx.emit(HostEvent::citation(
            format!(
                "Search queries: {}\nNumber of results per search queries: {per_query}",
                queries.join(" | ")
            ),
            "Lookup",
            "🔎 Lookup",
            None,
        ))
        .await;

        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut omitted = 0usize;
        let mut hits: Vec<SearchHit> = Vec::new();

        for query in &queries {
            debug!(%query, per_query, "Searching");
            let data = match self.fetch(query).await {
                Ok(data) => data,
                Err(e) => {
                    warn!(%query, error = %e, "Search request failed");
                    output.push_str(&describe_failure(query, &e));
                    continue;
                }
            };

            let Some(results) = data.get("results").and_then(|r| r.as_array()) else {
                output.push_str(&format!(
                    "Error: Unexpected response format from search engine for query: {query}\n"
                ));
                continue;
            };

            if results.is_empty() {
                output.push_str(&format!("No results found for query: {query}\n"));
                continue;
            }

            let mut number = 0usize;
            for result in results.iter().take(per_query) {
                let url = text_field(result, "url").unwrap_or_default();
                if url.is_empty() || !seen_urls.insert(url.to_string()) {
                    omitted += 1;
                    continue;
                }

                // Missing content gets a placeholder; null or empty content is skipped
                let content = match result.get("content") {
                    None => "No Content",
                    Some(value) => value.as_str().unwrap_or_default(),
                };
                if content.is_empty() {
                    continue;
                }
                let title = text_field(result, "title").unwrap_or("No Title");
                let content = content.replace('[', "&lbrack;").replace(']', "&rbrack;");

                number += 1;
                output.push_str(&format!("> {number}. [{title}]({url})\n> {content}\n"));

                ctx.emit(HostEvent::citation(
                    content.clone(),
                    title,
                    format!("{number}. {title}"),
                    Some(url.to_string()),
                ))
                .await;

                hits.push(SearchHit {
                    query: query.clone(),
                    title: title.to_string(),
                    url: url.to_string(),
                    content,
                });
            }
        }

        if omitted > 0 {
            output.push_str(&format!("\n> {omitted} results omitted. "));
        }

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output,
            data: Some(serde_json::json!({
                "queries": queries,
                "results": hits,
                "omitted": omitted,
            })),
        })
    }
}

fn text_field<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(|v| v.as_str())
}

/// The inline line reported for a query whose request failed.
fn describe_failure(query: &str, err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!(
            "Error: Timeout connecting to SearXNG for query: {query}. Please check the URL and try again.\n"
        )
    } else if err.is_connect() || err.is_request() {
        format!("Error connecting to search engine for query: {query}: {err}.\n")
    } else {
        format!("An unexpected error occurred for query: {query}: {err}\n")
    }
}
