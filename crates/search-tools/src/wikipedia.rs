//! Wikipedia lookup over the MediaWiki action API

use async_trait::async_trait;
use serde::Deserialize;

use crate::backend::SearchBackend;
use crate::error::{LookupError, LookupResult, read_text};
use crate::text::{squash_whitespace, truncate_chars};
use crate::{LookupLimits, MAX_QUERY_CHARS};

const SERVICE: &str = "Wikipedia";
const ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";

/// Returned when the search finds no page with text
pub const NO_RESULT: &str = "No good Wikipedia Search Result was found";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    query: Option<ExtractQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    missing: bool,
}

/// Titles from a `list=search` response, best match first
pub fn parse_search_titles(body: &str) -> LookupResult<Vec<String>> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| LookupError::parse(SERVICE, e))?;
    Ok(response
        .query
        .map(|q| q.search.into_iter().map(|hit| hit.title).collect())
        .unwrap_or_default())
}

/// `Page: <title>\nSummary: <extract>` from a `prop=extracts` response
pub fn parse_extract(body: &str) -> LookupResult<Option<String>> {
    let response: ExtractResponse =
        serde_json::from_str(body).map_err(|e| LookupError::parse(SERVICE, e))?;

    let page = response
        .query
        .and_then(|q| q.pages.into_iter().find(|p| !p.missing));

    Ok(page.and_then(|p| {
        let summary = squash_whitespace(p.extract.as_deref().unwrap_or_default());
        (!summary.is_empty()).then(|| format!("Page: {}\nSummary: {summary}", p.title))
    }))
}

/// Encyclopedia lookup tool, registered as `wikipedia`
pub struct WikipediaSearch {
    http: reqwest::Client,
    limits: LookupLimits,
}

impl WikipediaSearch {
    pub fn new(http: reqwest::Client, limits: LookupLimits) -> Self {
        Self {
            http,
            limits,
        }
    }

    async fn get(&self, params: &[(&str, &str)]) -> LookupResult<String> {
        let response = self
            .http
            .get(ENDPOINT)
            .query(&[("action", "query"), ("format", "json"), ("formatversion", "2")])
            .query(params)
            .send()
            .await
            .map_err(LookupError::http(SERVICE))?;
        read_text(SERVICE, response).await
    }

    async fn search_titles(&self, query: &str) -> LookupResult<Vec<String>> {
        let limit = self.limits.top_k.to_string();
        let body = self
            .get(&[("list", "search"), ("srsearch", query), ("srlimit", limit.as_str())])
            .await?;
        parse_search_titles(&body)
    }

    async fn page_summary(&self, title: &str) -> LookupResult<Option<String>> {
        let body = self
            .get(&[
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title),
            ])
            .await?;
        parse_extract(&body)
    }
}

#[async_trait]
impl SearchBackend for WikipediaSearch {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        "A wrapper around Wikipedia. Useful for when you need to answer general questions \
         about people, places, companies, facts, historical events, or other subjects. \
         Input should be a search query."
    }

    async fn lookup(&self, query: &str) -> LookupResult<String> {
        let query = truncate_chars(query, MAX_QUERY_CHARS);
        let titles = self.search_titles(query).await?;

        let mut docs = Vec::new();
        for title in titles.iter().take(self.limits.top_k) {
            if let Some(doc) = self.page_summary(title).await? {
                docs.push(doc);
            }
        }

        if docs.is_empty() {
            return Ok(NO_RESULT.to_string());
        }
        Ok(truncate_chars(&docs.join("\n\n"), self.limits.max_chars).to_string())
    }
}
