//! arXiv paper lookup over the Atom export API

use async_trait::async_trait;
use serde::Deserialize;

use crate::backend::SearchBackend;
use crate::error::{LookupError, LookupResult, read_text};
use crate::text::{squash_whitespace, truncate_chars};
use crate::{LookupLimits, MAX_QUERY_CHARS};

const SERVICE: &str = "arXiv";
const ENDPOINT: &str = "https://export.arxiv.org/api/query";

/// Returned when the feed has no entries
pub const NO_RESULT: &str = "No good Arxiv Result was found";

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    published: String,
    #[serde(default)]
    updated: Option<String>,
    #[serde(rename = "author", default)]
    authors: Vec<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: String,
}

impl Entry {
    /// `Published: <date>\nTitle: ..\nAuthors: ..\nSummary: ..`
    fn render(&self) -> String {
        let stamp = self.updated.as_deref().unwrap_or(&self.published);
        let date = stamp.split('T').next().unwrap_or_default();
        let authors = self
            .authors
            .iter()
            .map(|a| squash_whitespace(&a.name))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "Published: {date}\nTitle: {}\nAuthors: {authors}\nSummary: {}",
            squash_whitespace(&self.title),
            squash_whitespace(&self.summary),
        )
    }
}

/// Paper lookup tool, registered as `arxiv`
pub struct ArxivSearch {
    http: reqwest::Client,
    limits: LookupLimits,
}

impl ArxivSearch {
    pub fn new(http: reqwest::Client, limits: LookupLimits) -> Self {
        Self {
            http,
            limits,
        }
    }
}

/// Render an Atom feed into one observation
pub fn render_feed(xml: &str, limits: LookupLimits) -> LookupResult<String> {
    let feed: Feed = quick_xml::de::from_str(xml).map_err(|e| LookupError::parse(SERVICE, e))?;

    let docs: Vec<String> = feed
        .entries
        .iter()
        .filter(|e| !e.title.trim().is_empty())
        .take(limits.top_k)
        .map(Entry::render)
        .collect();

    if docs.is_empty() {
        return Ok(NO_RESULT.to_string());
    }
    Ok(truncate_chars(&docs.join("\n\n"), limits.max_chars).to_string())
}

#[async_trait]
impl SearchBackend for ArxivSearch {
    fn name(&self) -> &str {
        "arxiv"
    }

    fn description(&self) -> &str {
        "A wrapper around Arxiv.org. Useful for when you need to answer questions about \
         Physics, Mathematics, Computer Science, Quantitative Biology, Quantitative Finance, \
         Statistics, Electrical Engineering, and Economics from scientific articles on \
         arxiv.org. Input should be a search query."
    }

    async fn lookup(&self, query: &str) -> LookupResult<String> {
        let query = truncate_chars(query, MAX_QUERY_CHARS);
        let max_results = self.limits.top_k.to_string();

        let response = self
            .http
            .get(ENDPOINT)
            .query(&[
                ("search_query", query),
                ("start", "0"),
                ("max_results", max_results.as_str()),
            ])
            .send()
            .await
            .map_err(LookupError::http(SERVICE))?;

        let xml = read_text(SERVICE, response).await?;
        render_feed(&xml, self.limits)
    }
}
