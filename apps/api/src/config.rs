use anyhow::{bail, Context, Result};

use crate::llm_client::{LlmConfig, ProviderKind};

const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-5";
const DEFAULT_ANTHROPIC_FALLBACKS: &str = "claude-3-5-haiku-latest";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const DEFAULT_OPENAI_FALLBACKS: &str = "gpt-4o-mini";

/// Which backend carries ranking tasks from the pipeline to the ranking worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueBackend {
    InProcess,
    Redis,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub llm: LlmConfig,
    pub ranking_queue: QueueBackend,
    pub reassessment_concurrency: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let llm = llm_config_from_env()?;

        let redis_url = optional_env("REDIS_URL");
        let ranking_queue = match optional_env("RANKING_QUEUE").as_deref() {
            None | Some("memory") | Some("in-process") => QueueBackend::InProcess,
            Some("redis") => QueueBackend::Redis,
            Some(other) => bail!("RANKING_QUEUE must be 'memory' or 'redis', got '{other}'"),
        };
        if ranking_queue == QueueBackend::Redis && redis_url.is_none() {
            bail!("RANKING_QUEUE=redis requires REDIS_URL to be set");
        }

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            llm,
            ranking_queue,
            reassessment_concurrency: parse_env("REASSESSMENT_CONCURRENCY", 4usize)?.max(1),
            port: parse_env("PORT", 8080u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Builds the gateway configuration. At least one provider credential must be present.
fn llm_config_from_env() -> Result<LlmConfig> {
    let anthropic_api_key = optional_env("ANTHROPIC_API_KEY");
    let openai_api_key = optional_env("OPENAI_API_KEY");

    if anthropic_api_key.is_none() && openai_api_key.is_none() {
        bail!("No usable LLM credential: set ANTHROPIC_API_KEY or OPENAI_API_KEY");
    }

    let primary_provider = match optional_env("LLM_PRIMARY_PROVIDER").as_deref() {
        None => {
            if anthropic_api_key.is_some() {
                ProviderKind::Anthropic
            } else {
                ProviderKind::OpenAi
            }
        }
        Some(name) => name
            .parse::<ProviderKind>()
            .map_err(|e| anyhow::anyhow!("LLM_PRIMARY_PROVIDER: {e}"))?,
    };

    Ok(LlmConfig {
        anthropic_api_key,
        openai_api_key,
        anthropic_models: model_list(
            "ANTHROPIC_MODEL",
            DEFAULT_ANTHROPIC_MODEL,
            "ANTHROPIC_FALLBACK_MODELS",
            DEFAULT_ANTHROPIC_FALLBACKS,
        ),
        openai_models: model_list(
            "OPENAI_MODEL",
            DEFAULT_OPENAI_MODEL,
            "OPENAI_FALLBACK_MODELS",
            DEFAULT_OPENAI_FALLBACKS,
        ),
        primary_provider,
        timeout_secs: parse_env("LLM_TIMEOUT_SECS", 120u64)?,
    })
}

/// Primary model first, then the comma-separated fallbacks, without duplicates.
fn model_list(
    primary_key: &str,
    primary_default: &str,
    fallback_key: &str,
    fallback_default: &str,
) -> Vec<String> {
    let primary = optional_env(primary_key).unwrap_or_else(|| primary_default.to_string());
    let fallbacks = optional_env(fallback_key).unwrap_or_else(|| fallback_default.to_string());
    split_models(&primary, &fallbacks)
}

fn split_models(primary: &str, fallbacks: &str) -> Vec<String> {
    let mut models = vec![primary.trim().to_string()];
    for model in fallbacks.split(',').map(str::trim).filter(|m| !m.is_empty()) {
        if !models.iter().any(|m| m == model) {
            models.push(model.to_string());
        }
    }
    models.retain(|m| !m.is_empty());
    models
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match optional_env(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{key} has an invalid value: '{raw}'")),
    }
}
