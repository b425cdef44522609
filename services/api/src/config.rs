//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use support_chat_core::{PromptConfig, RetryPolicy};
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Deployment environment. API docs are only served outside production.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Local,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(format!("'{}' is not one of local, staging, production", other)),
        }
    }
}

/// Settings for the Pinecone vector-search provider.
#[derive(Clone, Debug)]
pub struct PineconeSettings {
    pub api_key: String,
    pub index_name: String,
    /// Data-plane host. Resolved from the index description when unset.
    pub index_host: Option<String>,
    pub namespace: String,
    pub api_base: String,
    pub embed_model: String,
    pub rerank_model: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub environment: Environment,
    pub cors_allowed_origins: Vec<String>,
    pub access_token_ttl: chrono::Duration,
    pub llm_api_base: String,
    pub llm_api_key: String,
    pub llm_model: String,
    pub pinecone: PineconeSettings,
    pub retrieval_top_k: usize,
    pub rerank_top_n: usize,
    pub retry_policy: RetryPolicy,
    pub provider_timeout: Duration,
    pub request_timeout: Duration,
    /// Total budget for classification, retries included.
    pub classify_timeout: Duration,
    pub prompts: PromptConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));

        // --- Server and Database Settings ---
        let bind_address = parse_var("BIND_ADDRESS", &var_or("BIND_ADDRESS", "0.0.0.0:8000"))?;
        let database_url = required("DATABASE_URL")?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let environment = var_or("ENVIRONMENT", "local")
            .parse::<Environment>()
            .map_err(|e| ConfigError::InvalidValue("ENVIRONMENT".to_string(), e))?;

        let cors_allowed_origins: Vec<String> =
            var_or("CORS_ALLOWED_ORIGINS", "http://localhost:3000")
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect();
        // Credentialed CORS cannot answer with a wildcard origin.
        if cors_allowed_origins.iter().any(|origin| origin == "*") {
            return Err(ConfigError::InvalidValue(
                "CORS_ALLOWED_ORIGINS".to_string(),
                "'*' cannot be combined with cookie credentials; list explicit origins".to_string(),
            ));
        }

        let token_minutes: i64 = parse_positive(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            &var_or("ACCESS_TOKEN_EXPIRE_MINUTES", "30"),
        )?;

        // --- Language Model Settings ---
        let llm_api_base = var_or("LLM_API_BASE", "http://localhost:11434/v1");
        let llm_api_key = lookup("LLM_API_KEY")
            .or_else(|| lookup("OPENAI_API_KEY"))
            .unwrap_or_else(|| "ollama".to_string());
        let llm_model = var_or("LLM_MODEL", "llama3.2:3b");

        // --- Vector Search Settings ---
        let pinecone = PineconeSettings {
            api_key: required("PINECONE_API_KEY")?,
            index_name: required("PINECONE_INDEX_NAME")?,
            index_host: lookup("PINECONE_INDEX_HOST").filter(|host| !host.trim().is_empty()),
            namespace: var_or("PINECONE_NAME_SPACE", ""),
            api_base: var_or("PINECONE_API_BASE", "https://api.pinecone.io"),
            embed_model: var_or("EMBED_MODEL", "llama-text-embed-v2"),
            rerank_model: var_or("RERANK_MODEL", "bge-reranker-v2-m3"),
        };
        let retrieval_top_k = parse_positive("RETRIEVAL_TOP_K", &var_or("RETRIEVAL_TOP_K", "5"))?;
        let rerank_top_n = parse_positive("RERANK_TOP_N", &var_or("RERANK_TOP_N", "1"))?;

        // --- Provider Retry & Timeouts ---
        let max_attempts =
            parse_positive("PROVIDER_MAX_ATTEMPTS", &var_or("PROVIDER_MAX_ATTEMPTS", "5"))?;
        let retry_delay_ms: u64 =
            parse_var("PROVIDER_RETRY_DELAY_MS", &var_or("PROVIDER_RETRY_DELAY_MS", "1000"))?;
        let provider_timeout_secs: u64 =
            parse_positive("PROVIDER_TIMEOUT_SECS", &var_or("PROVIDER_TIMEOUT_SECS", "60"))?;
        let request_timeout_secs: u64 =
            parse_positive("REQUEST_TIMEOUT_SECS", &var_or("REQUEST_TIMEOUT_SECS", "180"))?;
        let classify_timeout_secs: u64 =
            parse_positive("CLASSIFY_TIMEOUT_SECS", &var_or("CLASSIFY_TIMEOUT_SECS", "30"))?;
        if classify_timeout_secs >= request_timeout_secs {
            return Err(ConfigError::InvalidValue(
                "CLASSIFY_TIMEOUT_SECS".to_string(),
                format!(
                    "'{}' must be below REQUEST_TIMEOUT_SECS ({})",
                    classify_timeout_secs, request_timeout_secs
                ),
            ));
        }

        // --- Prompt Parameters ---
        let defaults = PromptConfig::default();
        let prompts = PromptConfig {
            brand: lookup("PROMPT_BRAND").unwrap_or(defaults.brand.clone()),
            tone: lookup("PROMPT_TONE").unwrap_or(defaults.tone.clone()),
            max_tokens_hint: match lookup("PROMPT_MAX_TOKENS_HINT") {
                Some(raw) => parse_positive("PROMPT_MAX_TOKENS_HINT", &raw)?,
                None => defaults.max_tokens_hint,
            },
            ..defaults
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            environment,
            cors_allowed_origins,
            access_token_ttl: chrono::Duration::minutes(token_minutes),
            llm_api_base,
            llm_api_key,
            llm_model,
            pinecone,
            retrieval_top_k,
            rerank_top_n,
            retry_policy: RetryPolicy::new(max_attempts, Duration::from_millis(retry_delay_ms)),
            provider_timeout: Duration::from_secs(provider_timeout_secs),
            request_timeout: Duration::from_secs(request_timeout_secs),
            classify_timeout: Duration::from_secs(classify_timeout_secs),
            prompts,
        })
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

fn parse_positive<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let value: T = parse_var(key, raw)?;
    if value <= T::default() {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("'{}' must be greater than zero", raw),
        ));
    }
    Ok(value)
}
