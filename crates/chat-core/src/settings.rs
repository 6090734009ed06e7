//! Session Settings
//!
//! Credential and result-count preference captured by the settings panel.
//! Held in memory for the session only; the API key is never serialized and
//! never printed.

use serde::{Deserialize, Serialize};

/// Secret credential for the hosted model endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, ignoring blank input
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into().trim().to_string();
        (!key.is_empty()).then_some(Self(key))
    }

    /// Raw key for the Authorization header
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("***")
    }
}

/// Number of web search results, always within `[MIN, MAX]`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct ResultCount(u8);

impl ResultCount {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;
    pub const DEFAULT: u8 = 3;

    /// Clamp any requested value into range
    pub fn new(value: i64) -> Self {
        let clamped = value.clamp(i64::from(Self::MIN), i64::from(Self::MAX));
        Self(u8::try_from(clamped).unwrap_or(Self::DEFAULT))
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        usize::from(self.0)
    }
}

impl Default for ResultCount {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl From<i64> for ResultCount {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl From<ResultCount> for u8 {
    fn from(count: ResultCount) -> Self {
        count.0
    }
}

/// Per-session settings
#[derive(Clone, Debug, Default)]
pub struct Settings {
    pub api_key: Option<ApiKey>,
    pub result_count: ResultCount,
}

impl Settings {
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Answer to "Was the response helpful?"
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Yes,
    No,
}

impl Feedback {
    /// On-screen acknowledgement. Feedback goes nowhere else.
    pub fn acknowledgement(self) -> String {
        let label = match self {
            Self::Yes => "Yes",
            Self::No => "No",
        };
        format!("Thank you for your feedback: {label}")
    }
}
