//! Server Configuration

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use chat_core::settings::ApiKey;
use chat_runtime::GroqConfig;

/// Settings read from the environment (after `.env` is loaded)
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub static_dir: PathBuf,
    /// Pre-populates new sessions; users can still replace it
    pub default_api_key: Option<ApiKey>,
    pub session_idle: Duration,
    pub max_iterations: usize,
    pub tool_timeout: Duration,
    pub groq: GroqConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            static_dir: PathBuf::from("static"),
            default_api_key: None,
            session_idle: Duration::from_secs(3600),
            max_iterations: 15,
            tool_timeout: Duration::from_secs(20),
            groq: GroqConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.groq = GroqConfig::from_env();
        Ok(config)
    }

    /// Build from any key lookup. Unset keys take defaults; malformed
    /// numbers are an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let max_iterations = parsed(&lookup, "AGENT_MAX_ITERATIONS")?.unwrap_or(defaults.max_iterations);
        anyhow::ensure!(max_iterations > 0, "AGENT_MAX_ITERATIONS must be at least 1");

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            static_dir: lookup("STATIC_DIR").map_or(defaults.static_dir, PathBuf::from),
            default_api_key: lookup("GROQ_API_KEY").and_then(ApiKey::new),
            session_idle: parsed(&lookup, "SESSION_IDLE_SECS")?
                .map_or(defaults.session_idle, Duration::from_secs),
            max_iterations,
            tool_timeout: parsed(&lookup, "TOOL_TIMEOUT_SECS")?
                .map_or(defaults.tool_timeout, Duration::from_secs),
            groq: defaults.groq,
        })
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| raw.trim().parse::<T>().with_context(|| format!("{key}={raw:?} is not a number")))
        .transpose()
}
