//! Lookup Errors

use thiserror::Error;

/// Result type alias for lookups
pub type LookupResult<T> = std::result::Result<T, LookupError>;

/// Failure talking to a lookup service
#[derive(Error, Debug)]
pub enum LookupError {
    /// Transport failure (connect, timeout, body read)
    #[error("{service} request failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status
    #[error("{service} returned HTTP {status}")]
    Status { service: &'static str, status: u16 },

    /// Response body did not have the expected shape
    #[error("{service} response could not be parsed: {message}")]
    Parse {
        service: &'static str,
        message: String,
    },

    /// Service refused to serve us (rate limiting, bot checks)
    #[error("{service} is unavailable: {message}")]
    Unavailable {
        service: &'static str,
        message: String,
    },
}

impl LookupError {
    pub(crate) fn http(service: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::Http { service, source }
    }

    pub(crate) fn parse(service: &'static str, message: impl ToString) -> Self {
        Self::Parse {
            service,
            message: message.to_string(),
        }
    }

    /// Whether a retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { source, .. } => source.is_timeout() || source.is_connect(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Unavailable { .. } => true,
            Self::Parse { .. } => false,
        }
    }
}

/// Check the status and read the body as text
pub(crate) async fn read_text(
    service: &'static str,
    response: reqwest::Response,
) -> LookupResult<String> {
    let status = response.status();
    if !status.is_success() {
        return Err(LookupError::Status {
            service,
            status: status.as_u16(),
        });
    }
    response.text().await.map_err(LookupError::http(service))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(LookupError::Status { service: "arxiv", status: 503 }.is_transient());
        assert!(LookupError::Status { service: "arxiv", status: 429 }.is_transient());
        assert!(!LookupError::Status { service: "arxiv", status: 404 }.is_transient());
        assert!(!LookupError::parse("wikipedia", "missing query").is_transient());
    }

    #[test]
    fn test_display_names_service() {
        let err = LookupError::Status { service: "DuckDuckGo", status: 202 };
        assert_eq!(err.to_string(), "DuckDuckGo returned HTTP 202");
    }
}
