//! academic_search tool - arXiv export API
//!
//! The export API answers with an Atom feed. Only a handful of fields are
//! needed, so entries are pulled apart with plain string scanning.

use std::time::Duration;

use async_trait::async_trait;
use eyre::WrapErr;
use log::debug;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Tool, ToolContext, ToolError, ToolOutput, parse_input, truncate};

const ARXIV_URL: &str = "http://export.arxiv.org/api/query";

/// arXiv rejects very long search strings
const MAX_QUERY_CHARS: usize = 300;

pub const NO_ARXIV_RESULT: &str = "No good arXiv result was found";

/// Search arXiv for scientific papers
pub struct AcademicSearchTool {
    client: reqwest::Client,
    max_results: usize,
    max_chars: usize,
}

#[derive(Debug, Deserialize)]
struct AcademicSearchArgs {
    query: String,
}

/// One entry of an arXiv feed
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Paper {
    pub published: String,
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
}

impl AcademicSearchTool {
    pub fn new(max_results: usize, max_chars: usize, timeout: Duration) -> eyre::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .wrap_err("failed to build arXiv HTTP client")?;

        Ok(Self {
            client,
            max_results,
            max_chars,
        })
    }
}

#[async_trait]
impl Tool for AcademicSearchTool {
    fn name(&self) -> &'static str {
        "academic_search"
    }

    fn description(&self) -> &'static str {
        "Search arXiv for scientific papers and academic research. Returns publication date, title, authors and abstract."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search terms for the paper or topic"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> Result<ToolOutput, eyre::Error> {
        let args: AcademicSearchArgs = parse_input(input)?;
        let query = args.query.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidInput {
                message: "query must not be empty".to_string(),
            }
            .into());
        }

        let query: String = query.chars().take(MAX_QUERY_CHARS).collect();
        debug!("academic_search: query={:?} max_results={}", query, self.max_results);

        let max_results = self.max_results.to_string();
        let response = self
            .client
            .get(ARXIV_URL)
            .query(&[
                ("search_query", query.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
            ])
            .send()
            .await
            .wrap_err("arXiv request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            eyre::bail!("arXiv API error {}: {}", status, error_text);
        }

        let feed = response.text().await.wrap_err("failed to read arXiv response")?;
        let papers = parse_feed(&feed);

        Ok(ToolOutput::success(render(&papers, self.max_results, self.max_chars)))
    }
}

/// Extract entries from an Atom feed
pub(crate) fn parse_feed(xml: &str) -> Vec<Paper> {
    xml.split("<entry>")
        .skip(1)
        .filter_map(|chunk| {
            let entry = chunk.split("</entry>").next()?;
            let title = element_text(entry, "title")?;
            let summary = element_text(entry, "summary").unwrap_or_default();
            let published = element_text(entry, "published").unwrap_or_default();
            let authors = entry
                .split("<author>")
                .skip(1)
                .filter_map(|a| element_text(a, "name"))
                .collect();

            Some(Paper {
                published: published.chars().take(10).collect(),
                title,
                authors,
                summary,
            })
        })
        .collect()
}

/// Text of the first `<tag>` element in `xml`, whitespace-collapsed and unescaped
fn element_text(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);

    let mut search_from = 0;
    let start = loop {
        let idx = search_from + xml[search_from..].find(&open)?;
        let after = &xml[idx + open.len()..];
        // Skip longer tags that share the prefix, e.g. <title> vs <titles>
        match after.chars().next() {
            Some('>') | Some(' ') => break idx,
            _ => search_from = idx + open.len(),
        }
    };

    let content_start = start + xml[start..].find('>')? + 1;
    let content_end = content_start + xml[content_start..].find(&close)?;
    let raw = &xml[content_start..content_end];

    let text = unescape(&raw.split_whitespace().collect::<Vec<_>>().join(" "));
    if text.is_empty() { None } else { Some(text) }
}

/// Decode XML entities in one pass; anything unrecognised is kept as written
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];

        let decoded = rest[1..]
            .find(';')
            .filter(|end| *end <= 10)
            .and_then(|end| decode_entity(&rest[1..=end]).map(|c| (c, end + 2)));

        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "amp" => Some('&'),
        _ => {
            let code = match name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => name.strip_prefix('#')?.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Render papers as a digest capped at `max_chars` characters
pub(crate) fn render(papers: &[Paper], max_results: usize, max_chars: usize) -> String {
    if papers.is_empty() {
        return NO_ARXIV_RESULT.to_string();
    }

    let blocks: Vec<String> = papers
        .iter()
        .take(max_results)
        .map(|p| {
            format!(
                "Published: {}\nTitle: {}\nAuthors: {}\nSummary: {}",
                p.published,
                p.title,
                p.authors.join(", "),
                p.summary
            )
        })
        .collect();

    truncate(&blocks.join("\n\n"), max_chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: search_query=all:attention</title>
  <id>http://arxiv.org/api/abc</id>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <updated>2023-08-02T00:41:18Z</updated>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All
      You Need</title>
    <summary>  The dominant sequence transduction models are based on complex
recurrent or convolutional neural networks &amp; attention.
    </summary>
    <author>
      <name>Ashish Vaswani</name>
    </author>
    <author>
      <name>Noam Shazeer</name>
      <arxiv:affiliation xmlns:arxiv="http://arxiv.org/schemas/atom">Google</arxiv:affiliation>
    </author>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/1810.04805v2</id>
    <published>2018-10-11T00:50:01Z</published>
    <title>BERT: Pre-training of Deep Bidirectional Transformers</title>
    <summary>We introduce a new language representation model called BERT.</summary>
    <author><name>Jacob Devlin</name></author>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed() {
        let papers = parse_feed(FEED);
        assert_eq!(papers.len(), 2);

        assert_eq!(papers[0].published, "2017-06-12");
        assert_eq!(papers[0].title, "Attention Is All You Need");
        assert_eq!(papers[0].authors, vec!["Ashish Vaswani", "Noam Shazeer"]);
        assert!(papers[0].summary.starts_with("The dominant sequence"));
        assert!(papers[0].summary.ends_with("networks & attention."));

        assert_eq!(papers[1].authors, vec!["Jacob Devlin"]);
    }

    #[test]
    fn test_parse_feed_without_entries() {
        let empty = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>ArXiv Query</title></feed>"#;
        assert!(parse_feed(empty).is_empty());
    }

    #[test]
    fn test_render_blocks() {
        let out = render(&parse_feed(FEED), 3, 2000);
        assert!(out.starts_with("Published: 2017-06-12\nTitle: Attention Is All You Need\n"));
        assert!(out.contains("Authors: Ashish Vaswani, Noam Shazeer\n"));
        assert!(out.contains("\n\nPublished: 2018-10-11\n"));
    }

    #[test]
    fn test_render_respects_limits() {
        let papers = parse_feed(FEED);
        let out = render(&papers, 1, 2000);
        assert!(!out.contains("BERT"));

        let out = render(&papers, 3, 40);
        assert_eq!(out.chars().count(), 43);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&[], 3, 2000), NO_ARXIV_RESULT);
    }

    #[test]
    fn test_element_text_skips_prefixed_tags() {
        let xml = "<titles>nope</titles><title>yes</title>";
        assert_eq!(element_text(xml, "title"), Some("yes".to_string()));
        assert_eq!(element_text(xml, "summary"), None);
    }

    #[test]
    fn test_unescape_entities() {
        assert_eq!(unescape("Schr&#246;dinger&#39;s cat"), "Schrödinger's cat");
        assert_eq!(unescape("pages 1&#x2013;9 &amp; more"), "pages 1\u{2013}9 & more");
        assert_eq!(unescape("&amp;lt; stays literal"), "&lt; stays literal");
        assert_eq!(unescape("AT&T &bogus; &#xZZ;"), "AT&T &bogus; &#xZZ;");
    }
}
