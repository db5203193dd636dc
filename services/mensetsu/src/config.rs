//! Service configuration, loaded from the environment.

use std::env;
use tracing::Level;

/// Which agent-connection backend sessions are built with.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentBackend {
    OpenAi,
    /// Deterministic scripted connections; no network, no API key.
    Scripted,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub realtime_model: String,
    pub bind_addr: String,
    pub backend: AgentBackend,
    pub log_level: Level,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `AGENT_BACKEND`: "openai" or "scripted". Defaults to "openai".
    // *   `OPENAI_API_KEY`: Required when the backend is "openai".
    // *   `REALTIME_MODEL`: (Optional) The realtime model for agent sessions.
    // *   `BIND_ADDR`: (Optional) Listen address. Defaults to "0.0.0.0:3000".
    // *   `RUST_LOG`: (Optional) Logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. Useful for local development, ignored if absent.
        dotenvy::dotenv().ok();

        let backend_str = env::var("AGENT_BACKEND").unwrap_or_else(|_| "openai".to_string());
        let backend = match backend_str.to_lowercase().as_str() {
            "scripted" => AgentBackend::Scripted,
            _ => AgentBackend::OpenAi,
        };

        let openai_api_key = env::var("OPENAI_API_KEY").ok();
        let realtime_model = env::var("REALTIME_MODEL")
            .unwrap_or_else(|_| mensetsu_realtime::config::DEFAULT_REALTIME_MODEL.to_string());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        let config = Self {
            openai_api_key,
            realtime_model,
            bind_addr,
            backend,
            log_level,
        };

        if config.backend == AgentBackend::OpenAi && config.openai_api_key.is_none() {
            return Err(ConfigError::MissingVar(
                "OPENAI_API_KEY must be set for the openai backend".to_string(),
            ));
        }

        Ok(config)
    }
}
