/// LLM Gateway: the single point of entry for all generative-language calls.
///
/// ARCHITECTURAL RULE: No other module may call a provider API directly.
/// All LLM interactions MUST go through `LlmGateway::call`.
///
/// Each provider carries an ordered model list (configured primary first, then
/// fallbacks). A model-availability error advances to the next model of the same
/// provider; any other error abandons the provider and moves to the next one.
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod prompts;
pub mod providers;

use providers::{AnthropicBackend, OpenAiBackend};

const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::OpenAi => write!(f, "openai"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "openai" | "open_ai" => Ok(ProviderKind::OpenAi),
            other => Err(format!("unknown provider '{other}'")),
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Model '{model}' is not available: {message}")]
    ModelUnavailable { model: String, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM response is not a JSON object")]
    NotAnObject,

    #[error("No usable LLM credential configured")]
    NoCredentials,

    #[error("All LLM providers failed: {}", format_attempts(.attempts))]
    Exhausted { attempts: Vec<AttemptFailure> },
}

impl LlmError {
    /// True for errors meaning "this model does not exist / is not served here".
    /// These advance to the next model of the same provider.
    pub fn is_model_unavailable(&self) -> bool {
        match self {
            LlmError::ModelUnavailable { .. } => true,
            LlmError::Api { status, message } => {
                *status == 404 || mentions_missing_model(message)
            }
            _ => false,
        }
    }
}

fn mentions_missing_model(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("model_not_found")
        || lower.contains("not_found_error")
        || (lower.contains("model") && lower.contains("does not exist"))
}

/// One failed provider/model attempt, kept for the aggregated error.
#[derive(Debug, Clone)]
pub struct AttemptFailure {
    pub provider: ProviderKind,
    pub model: String,
    pub error: String,
}

fn format_attempts(attempts: &[AttemptFailure]) -> String {
    if attempts.is_empty() {
        return "no attempts were made".to_string();
    }
    attempts
        .iter()
        .map(|a| format!("{}/{}: {}", a.provider, a.model, a.error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Per-call knobs.
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub preferred_provider: Option<ProviderKind>,
    pub system: Option<&'static str>,
}

impl CallOptions {
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature,
            ..Self::default()
        }
    }

    pub fn system(mut self, system: &'static str) -> Self {
        self.system = Some(system);
        self
    }

    pub fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = tokens;
        self
    }
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            preferred_provider: None,
            system: None,
        }
    }
}

/// Normalised result of one successful exchange.
#[derive(Debug, Clone)]
pub struct LlmReply {
    pub text: String,
    pub model_used: String,
    pub provider_used: ProviderKind,
}

/// A provider API able to complete one prompt with a named model.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        options: &CallOptions,
    ) -> Result<String, LlmError>;
}

/// Gateway configuration, injected explicitly rather than read from the environment.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_models: Vec<String>,
    pub openai_models: Vec<String>,
    pub primary_provider: ProviderKind,
    pub timeout_secs: u64,
}

#[derive(Clone)]
struct ProviderRoute {
    backend: Arc<dyn CompletionBackend>,
    models: Vec<String>,
}

/// The gateway used by all services. Cheap to clone.
#[derive(Clone)]
pub struct LlmGateway {
    routes: Vec<ProviderRoute>,
}

impl LlmGateway {
    /// Builds the gateway from configuration. Fails when no provider has a credential.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        let mut routes: Vec<(Arc<dyn CompletionBackend>, Vec<String>)> = Vec::new();
        if let Some(key) = &config.anthropic_api_key {
            routes.push((
                Arc::new(AnthropicBackend::new(http.clone(), key.clone())),
                config.anthropic_models.clone(),
            ));
        }
        if let Some(key) = &config.openai_api_key {
            routes.push((
                Arc::new(OpenAiBackend::new(http.clone(), key.clone())),
                config.openai_models.clone(),
            ));
        }

        // Primary provider first; the rest keep their configured order.
        routes.sort_by_key(|(backend, _)| backend.kind() != config.primary_provider);

        Self::with_backends(routes)
    }

    /// Builds a gateway from explicit backends, in priority order.
    pub fn with_backends(
        routes: Vec<(Arc<dyn CompletionBackend>, Vec<String>)>,
    ) -> Result<Self, LlmError> {
        let routes: Vec<ProviderRoute> = routes
            .into_iter()
            .filter(|(_, models)| !models.is_empty())
            .map(|(backend, models)| ProviderRoute { backend, models })
            .collect();

        if routes.is_empty() {
            return Err(LlmError::NoCredentials);
        }
        Ok(Self { routes })
    }

    /// Provider/model pairs in the order they would be attempted, for startup logging.
    pub fn describe(&self) -> String {
        self.routes
            .iter()
            .map(|r| format!("{}[{}]", r.backend.kind(), r.models.join(", ")))
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Issues one prompt, falling back across models and providers.
    pub async fn call(&self, prompt: &str, options: &CallOptions) -> Result<LlmReply, LlmError> {
        let mut attempts = Vec::new();

        for route in self.ordered_routes(options.preferred_provider) {
            let provider = route.backend.kind();

            for model in &route.models {
                debug!(%provider, %model, "LLM call attempt");
                match route.backend.complete(model, prompt, options).await {
                    Ok(text) if !text.trim().is_empty() => {
                        info!(%provider, %model, "LLM call succeeded");
                        return Ok(LlmReply {
                            text,
                            model_used: model.clone(),
                            provider_used: provider,
                        });
                    }
                    Ok(_) => {
                        warn!(%provider, %model, "LLM returned empty content, abandoning provider");
                        attempts.push(AttemptFailure {
                            provider,
                            model: model.clone(),
                            error: LlmError::EmptyContent.to_string(),
                        });
                        break;
                    }
                    Err(e) if e.is_model_unavailable() => {
                        warn!(%provider, %model, "Model unavailable, trying next model: {e}");
                        attempts.push(AttemptFailure {
                            provider,
                            model: model.clone(),
                            error: e.to_string(),
                        });
                    }
                    Err(e) => {
                        warn!(%provider, %model, "Provider failed, abandoning provider: {e}");
                        attempts.push(AttemptFailure {
                            provider,
                            model: model.clone(),
                            error: e.to_string(),
                        });
                        break;
                    }
                }
            }
        }

        Err(LlmError::Exhausted { attempts })
    }

    fn ordered_routes(&self, preferred: Option<ProviderKind>) -> Vec<&ProviderRoute> {
        let mut routes: Vec<&ProviderRoute> = self.routes.iter().collect();
        if let Some(preferred) = preferred {
            routes.sort_by_key(|r| r.backend.kind() != preferred);
        }
        routes
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Parses model output as a JSON object, tolerating code fences and prose around it.
pub fn parse_json_object(text: &str) -> Result<Map<String, Value>, LlmError> {
    let text = strip_json_fences(text);

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        return Ok(map);
    }

    // Fall back to the outermost {...} span when the model wrapped it in prose.
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => {
            match serde_json::from_str::<Value>(&text[start..=end]) {
                Ok(Value::Object(map)) => Ok(map),
                _ => Err(LlmError::NotAnObject),
            }
        }
        _ => Err(LlmError::NotAnObject),
    }
}
