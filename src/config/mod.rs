pub mod models;
pub mod topics;

use crate::cli::Args;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {field} '{value}': {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error("Unsupported history store type: {0}")]
    UnsupportedHistoryType(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryType {
    Memory,
    Redis,
}

/// Everything the client reads from its environment, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub health_timeout: Duration,
    pub inference_token: Option<String>,
    pub inference_url: String,
    pub history_type: HistoryType,
    pub history_host: String,
    pub history_redis_prefix: String,
    pub storage_dir: String,
}

impl ClientConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let history_type = match args.history_type.to_lowercase().as_str() {
            "memory" => HistoryType::Memory,
            "redis" => HistoryType::Redis,
            other => {
                return Err(ConfigError::UnsupportedHistoryType(other.to_string()));
            }
        };

        Ok(Self {
            api_url: normalize_base_url("api_url", &args.api_url)?,
            health_timeout: Duration::from_secs(args.health_timeout_secs),
            inference_token: Some(args.hf_api_token.trim().to_string()).filter(|t| !t.is_empty()),
            inference_url: normalize_base_url("hf_inference_url", &args.hf_inference_url)?,
            history_type,
            history_host: args.history_host.clone(),
            history_redis_prefix: args.history_redis_prefix.clone(),
            storage_dir: args.storage_dir.clone(),
        })
    }

    /// Config pointing at `api_url` with defaults for everything else.
    pub fn for_backend(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: normalize_base_url("api_url", api_url)?,
            ..Self::default()
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            health_timeout: Duration::from_secs(5),
            inference_token: None,
            inference_url: "https://api-inference.huggingface.co/models".to_string(),
            history_type: HistoryType::Memory,
            history_host: "redis://127.0.0.1:6379".to_string(),
            history_redis_prefix: "casecut:".to_string(),
            storage_dir: "uploads".to_string(),
        }
    }
}

fn normalize_base_url(field: &'static str, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    Url::parse(trimmed).map_err(|e| ConfigError::InvalidUrl {
        field,
        value: raw.to_string(),
        reason: e.to_string(),
    })?;
    Ok(trimmed.to_string())
}
