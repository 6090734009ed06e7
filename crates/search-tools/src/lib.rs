//! # search-tools
//!
//! The three lookup tools the search-chat agent can call:
//!
//! | Tool        | Service                     | Results            |
//! |-------------|-----------------------------|--------------------|
//! | `Search`    | DuckDuckGo HTML results     | `result_count`     |
//! | `arxiv`     | arXiv Atom export API       | 1, 200 chars       |
//! | `wikipedia` | MediaWiki action API        | 1, 200 chars       |
//!
//! Each service sits behind [`SearchBackend`]; [`LookupTool`] adapts a backend
//! to `chat_core::Tool`.

pub mod arxiv;
pub mod backend;
pub mod duckduckgo;
pub mod error;
pub mod text;
pub mod wikipedia;

use chat_core::settings::ResultCount;
use chat_core::tool::ToolRegistry;

pub use arxiv::ArxivSearch;
pub use backend::{LookupTool, SearchBackend, StaticBackend};
pub use duckduckgo::DuckDuckGoSearch;
pub use error::{LookupError, LookupResult};
pub use text::truncate_chars;
pub use wikipedia::WikipediaSearch;

/// Longest query forwarded to arXiv and Wikipedia
pub const MAX_QUERY_CHARS: usize = 300;

/// Per-snippet character cap
pub const SNIPPET_CHARS: usize = 200;

/// Caps applied to a lookup's output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LookupLimits {
    /// Number of results to keep
    pub top_k: usize,
    /// Characters per result (web search) or per observation (arxiv, wikipedia)
    pub max_chars: usize,
}

impl LookupLimits {
    pub const fn new(top_k: usize, max_chars: usize) -> Self {
        Self { top_k, max_chars }
    }
}

impl Default for LookupLimits {
    fn default() -> Self {
        Self::new(1, SNIPPET_CHARS)
    }
}

/// Build the agent's tools in their fixed order: `Search`, `arxiv`, `wikipedia`
pub fn toolset(http: &reqwest::Client, result_count: ResultCount) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(LookupTool::new(DuckDuckGoSearch::new(
        http.clone(),
        LookupLimits::new(result_count.as_usize(), SNIPPET_CHARS),
    )));
    registry.register(LookupTool::new(ArxivSearch::new(
        http.clone(),
        LookupLimits::default(),
    )));
    registry.register(LookupTool::new(WikipediaSearch::new(
        http.clone(),
        LookupLimits::default(),
    )));
    registry
}
