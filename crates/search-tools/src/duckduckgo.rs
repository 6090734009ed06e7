//! DuckDuckGo web search over the HTML endpoint

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::backend::SearchBackend;
use crate::error::{LookupError, LookupResult, read_text};
use crate::text::{html_to_text, truncate_chars};
use crate::LookupLimits;

const SERVICE: &str = "DuckDuckGo";
const ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Returned when the page has no snippets
pub const NO_RESULT: &str = "No good DuckDuckGo Search Result was found";

static SNIPPET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<(?:a|div|td)[^>]*class="[^"]*result__snippet[^"]*"[^>]*>(.*?)</(?:a|div|td)>"#)
        .expect("valid snippet regex")
});

/// Web search tool, registered as `Search`
pub struct DuckDuckGoSearch {
    http: reqwest::Client,
    limits: LookupLimits,
}

impl DuckDuckGoSearch {
    pub fn new(http: reqwest::Client, limits: LookupLimits) -> Self {
        Self {
            http,
            limits,
        }
    }
}

/// Pull result snippets out of the HTML results page
pub fn parse_snippets(html: &str, limits: LookupLimits) -> Vec<String> {
    SNIPPET_RE
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| html_to_text(m.as_str()))
        .filter(|s| !s.is_empty())
        .take(limits.top_k)
        .map(|s| truncate_chars(&s, limits.max_chars).to_string())
        .collect()
}

fn render(html: &str, limits: LookupLimits) -> String {
    let snippets = parse_snippets(html, limits);
    if snippets.is_empty() {
        NO_RESULT.to_string()
    } else {
        snippets.join(" ")
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "Search"
    }

    fn description(&self) -> &str {
        "A wrapper around DuckDuckGo Search. Useful for when you need to answer questions \
         about current events. Input should be a search query."
    }

    async fn lookup(&self, query: &str) -> LookupResult<String> {
        let response = self
            .http
            .post(ENDPOINT)
            .form(&[("q", query), ("b", ""), ("kl", "wt-wt")])
            .send()
            .await
            .map_err(LookupError::http(SERVICE))?;

        // A 202 with an empty page is the bot check.
        if response.status() == reqwest::StatusCode::ACCEPTED {
            return Err(LookupError::Unavailable {
                service: SERVICE,
                message: "rate limited".into(),
            });
        }

        let html = read_text(SERVICE, response).await?;
        Ok(render(&html, self.limits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<div class="result results_links results_links_deep web-result">
  <h2 class="result__title"><a class="result__a" href="https://www.rust-lang.org/">Rust Programming Language</a></h2>
  <a class="result__snippet" href="https://www.rust-lang.org/">A language empowering everyone to build <b>reliable</b> and efficient software.</a>
</div>
<div class="result results_links results_links_deep web-result">
  <a class="result__snippet" href="https://en.wikipedia.org/wiki/Rust">Rust is a general-purpose programming language emphasizing performance, type safety, &amp; concurrency.</a>
</div>
<div class="result results_links results_links_deep web-result">
  <a class="result__snippet" href="https://doc.rust-lang.org/book/">The Rust Programming Language book.</a>
</div>
"#;

    #[test]
    fn test_parse_snippets_respects_top_k() {
        let snippets = parse_snippets(PAGE, LookupLimits::new(2, 200));
        assert_eq!(snippets.len(), 2);
        assert_eq!(
            snippets[0],
            "A language empowering everyone to build reliable and efficient software."
        );
        assert!(snippets[1].contains("type safety, & concurrency"));
    }

    #[test]
    fn test_snippets_truncated() {
        let snippets = parse_snippets(PAGE, LookupLimits::new(5, 10));
        assert_eq!(snippets.len(), 3);
        assert!(snippets.iter().all(|s| s.chars().count() <= 10));
    }

    #[test]
    fn test_render_empty_page() {
        assert_eq!(render("<html><body>No results.</body></html>", LookupLimits::default()), NO_RESULT);
    }

    #[test]
    fn test_render_joins_with_space() {
        let text = render(PAGE, LookupLimits::new(3, 200));
        assert!(text.starts_with("A language empowering"));
        assert!(text.ends_with("The Rust Programming Language book."));
        assert!(!text.contains('\n'));
    }
}
