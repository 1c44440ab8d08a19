use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Defines the supported backends for the response evaluator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvaluatorProvider {
    Stub,
    OpenAi,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub provider: EvaluatorProvider,
    pub openai_api_key: Option<String>,
    pub chat_model: String,
    pub room_url: String,
    pub log_level: Level,
    pub response_timeout_secs: u64,
    pub greeting_settle_secs: u64,
    pub question_gap_secs: u64,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// This function will look for a `.env` file in the current directory
    /// and load the following variables:
    ///
    /// *   `BIND_ADDRESS`: The address and port to bind the server to (e.g., "0.0.0.0:8000").
    /// *   `EVALUATOR`: The response evaluator backend. Can be "stub" or "openai". Defaults to "stub".
    /// *   `OPENAI_API_KEY`: Your secret key for the OpenAI API. Required if evaluator is "openai".
    /// *   `CHAT_MODEL`: (Optional) The model used to score answers. Defaults to "gpt-4o".
    /// *   `ROOM_URL`: (Optional) The real-time room server URL handed to each session.
    /// *   `RESPONSE_TIMEOUT_SECS`: (Optional) Per-question answer wait. Defaults to 60.
    /// *   `GREETING_SETTLE_SECS`: (Optional) Pause after the greeting. Defaults to 5.
    /// *   `QUESTION_GAP_SECS`: (Optional) Pause between questions. Defaults to 3.
    /// *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let provider_str = std::env::var("EVALUATOR").unwrap_or_else(|_| "stub".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "openai" => EvaluatorProvider::OpenAi,
            _ => EvaluatorProvider::Stub,
        };

        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();

        let chat_model = std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

        let room_url =
            std::env::var("ROOM_URL").unwrap_or_else(|_| "sim://interview".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let response_timeout_secs = parse_secs("RESPONSE_TIMEOUT_SECS", 60)?;
        let greeting_settle_secs = parse_secs("GREETING_SETTLE_SECS", 5)?;
        let question_gap_secs = parse_secs("QUESTION_GAP_SECS", 3)?;

        // Validate that the required API key is present for the selected evaluator.
        if provider == EvaluatorProvider::OpenAi && openai_api_key.is_none() {
            return Err(ConfigError::MissingVar(
                "OPENAI_API_KEY must be set for 'openai' evaluator".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            provider,
            openai_api_key,
            chat_model,
            room_url,
            log_level,
            response_timeout_secs,
            greeting_settle_secs,
            question_gap_secs,
        })
    }
}

fn parse_secs(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
