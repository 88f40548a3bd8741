//! DuckDuckGo web search tool.
//!
//! Wraps the Instant Answer API: forwards the query string and flattens the
//! JSON answer into plain text for the research agent.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::tools::Tool;

pub const WEB_SEARCH_TOOL_NAME: &str = "web_search";

const DUCKDUCKGO_API_URL: &str = "https://api.duckduckgo.com/";

pub struct DuckDuckGoSearchTool {
    client: Client,
    max_results: usize,
}

impl DuckDuckGoSearchTool {
    pub fn new(timeout_secs: u64, max_results: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .context("failed to build web search HTTP client")?;
        Ok(Self {
            client,
            max_results: max_results.max(1),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "Answer", default)]
    pub answer: String,
    #[serde(rename = "AbstractText", default)]
    pub abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    pub abstract_url: String,
    #[serde(rename = "RelatedTopics", default)]
    pub related_topics: Vec<RelatedTopic>,
}

/// Related topics arrive either as plain entries (`Text`/`FirstURL`) or as
/// named groups carrying a nested `Topics` list.
#[derive(Debug, Default, Deserialize)]
pub struct RelatedTopic {
    #[serde(rename = "Text", default)]
    pub text: Option<String>,
    #[serde(rename = "FirstURL", default)]
    pub first_url: Option<String>,
    #[serde(rename = "Topics", default)]
    pub topics: Vec<RelatedTopic>,
}

/// Instant answer and abstract lines come first; `max_results` caps only the
/// related-topic lines that follow.
pub fn flatten_results(response: &SearchResponse, query: &str, max_results: usize) -> String {
    let mut lines = Vec::<String>::new();

    if !response.answer.trim().is_empty() {
        lines.push(response.answer.trim().to_string());
    }
    if !response.abstract_text.trim().is_empty() {
        if response.abstract_url.trim().is_empty() {
            lines.push(response.abstract_text.trim().to_string());
        } else {
            lines.push(format!(
                "{} (source: {})",
                response.abstract_text.trim(),
                response.abstract_url.trim()
            ));
        }
    }

    let mut remaining = max_results;
    collect_topic_lines(&response.related_topics, &mut lines, &mut remaining);

    if lines.is_empty() {
        return format!("No search results found for '{query}'.");
    }
    lines.join("\n")
}

fn collect_topic_lines(topics: &[RelatedTopic], lines: &mut Vec<String>, remaining: &mut usize) {
    for topic in topics {
        if *remaining == 0 {
            return;
        }
        if let Some(text) = topic.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            match topic.first_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
                Some(url) => lines.push(format!("- {text} ({url})")),
                None => lines.push(format!("- {text}")),
            }
            *remaining -= 1;
        }
        collect_topic_lines(&topic.topics, lines, remaining);
    }
}

#[async_trait]
impl Tool for DuckDuckGoSearchTool {
    fn name(&self) -> &str {
        WEB_SEARCH_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Searches the web using DuckDuckGo for the given query."
    }

    async fn call(&self, input: &str) -> Result<String> {
        let query = input.trim();
        if query.is_empty() {
            return Err(anyhow::anyhow!("web search received an empty query"));
        }

        debug!(query, "running DuckDuckGo search");

        let response = self
            .client
            .get(DUCKDUCKGO_API_URL)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .context("web search request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("web search returned status {status}"));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .context("failed to parse web search response")?;

        Ok(flatten_results(&parsed, query, self.max_results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response() -> SearchResponse {
        serde_json::from_str(
            r#"{
                "Answer": "",
                "AbstractText": "Lighthouses guide mariners at night.",
                "AbstractURL": "https://en.wikipedia.org/wiki/Lighthouse",
                "RelatedTopics": [
                    {"Text": "Pharos of Alexandria", "FirstURL": "https://example.com/pharos"},
                    {"Name": "By country", "Topics": [
                        {"Text": "Lighthouses of France", "FirstURL": "https://example.com/fr"}
                    ]},
                    {"Text": "Keeper's log"}
                ]
            }"#,
        )
        .expect("sample response should parse")
    }

    #[test]
    fn flatten_includes_abstract_and_related_topics() {
        let text = flatten_results(&sample_response(), "lighthouses", 5);
        assert!(text.contains("Lighthouses guide mariners at night."));
        assert!(text.contains("(source: https://en.wikipedia.org/wiki/Lighthouse)"));
        assert!(text.contains("- Pharos of Alexandria (https://example.com/pharos)"));
        assert!(text.contains("- Lighthouses of France (https://example.com/fr)"));
        assert!(text.contains("- Keeper's log"));
    }

    #[test]
    fn flatten_caps_related_topics_at_max_results() {
        let text = flatten_results(&sample_response(), "lighthouses", 1);
        assert!(text.contains("- Pharos of Alexandria"));
        assert!(!text.contains("Lighthouses of France"));
        assert!(!text.contains("Keeper's log"));
    }

    #[test]
    fn flatten_reports_empty_results() {
        let empty = SearchResponse::default();
        assert_eq!(
            flatten_results(&empty, "obscure query", 5),
            "No search results found for 'obscure query'."
        );
    }

    #[test]
    fn unnamed_group_entries_parse_without_text() {
        let response: SearchResponse =
            serde_json::from_str(r#"{"RelatedTopics": [{"Name": "Empty group", "Topics": []}]}"#)
                .expect("group-only response should parse");
        assert_eq!(
            flatten_results(&response, "q", 5),
            "No search results found for 'q'."
        );
    }
}
