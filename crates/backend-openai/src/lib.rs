use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use planner_config::OpenAiConfigToml;
use planner_core::{CoreError, RecommendationAdvisor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const SYSTEM_PROMPT: &str =
    "You are a sprint planning assistant. Reply with a single JSON object and nothing else.";

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl OpenAiConfig {
    pub fn from_env() -> Result<Self, CoreError> {
        let model = std::env::var("OPENAI_MODEL")
            .ok()
            .map(|model| model.trim().to_owned())
            .filter(|model| !model.is_empty())
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_owned());
        Ok(Self {
            api_key: api_key_from_env()?,
            model,
            base_url: DEFAULT_OPENAI_BASE_URL.to_owned(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }

    /// The key is only ever read from the environment; everything else comes
    /// from the loaded config file.
    pub fn from_settings(settings: &OpenAiConfigToml) -> Result<Self, CoreError> {
        let timeout_secs = if settings.request_timeout_secs == 0 {
            DEFAULT_REQUEST_TIMEOUT_SECS
        } else {
            settings.request_timeout_secs
        };
        Ok(Self {
            api_key: api_key_from_env()?,
            model: settings.model.trim().to_owned(),
            base_url: settings.base_url.trim().trim_end_matches('/').to_owned(),
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn api_key_from_env() -> Result<String, CoreError> {
    let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
        CoreError::Configuration(
            "OPENAI_API_KEY is not set. Export a valid key to enable model-backed recommendations."
                .to_owned(),
        )
    })?;
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return Err(CoreError::Configuration(
            "OPENAI_API_KEY is empty. Provide a non-empty API key.".to_owned(),
        ));
    }
    Ok(api_key.to_owned())
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct OpenAiAdvisor {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl fmt::Debug for OpenAiAdvisor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("OpenAiAdvisor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OpenAiAdvisor {
    pub fn new(config: OpenAiConfig) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent("sprint-planner/backend-openai")
            .build()
            .map_err(|err| {
                CoreError::DependencyUnavailable(format!(
                    "failed to initialize OpenAI HTTP client: {err}"
                ))
            })?;
        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }
}

#[async_trait]
impl RecommendationAdvisor for OpenAiAdvisor {
    fn name(&self) -> &str {
        "openai"
    }

    async fn advise(&self, prompt: &str) -> Result<Value, CoreError> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: 0.2,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                CoreError::DependencyUnavailable(format!("failed to call OpenAI API: {err}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            CoreError::DependencyUnavailable(format!(
                "failed to read response from OpenAI API: {err}"
            ))
        })?;
        if !status.is_success() {
            return Err(CoreError::DependencyUnavailable(format!(
                "OpenAI API returned HTTP {}: {}",
                status,
                truncate_for_error(&body)
            )));
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&body).map_err(|err| {
            CoreError::DependencyUnavailable(format!("failed to parse OpenAI response JSON: {err}"))
        })?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                CoreError::DependencyUnavailable(
                    "OpenAI response did not include a message".to_owned(),
                )
            })?;
        debug!(model = %self.config.model, chars = content.len(), "received advisor reply");

        parse_advice(&content)
    }
}

fn parse_advice(content: &str) -> Result<Value, CoreError> {
    let advice: Value = serde_json::from_str(content.trim()).map_err(|err| {
        CoreError::InvalidInput(format!(
            "OpenAI reply was not valid JSON: {err}: {}",
            truncate_for_error(content)
        ))
    })?;
    if !advice.is_object() {
        return Err(CoreError::InvalidInput(
            "OpenAI reply was JSON but not an object".to_owned(),
        ));
    }
    Ok(advice)
}

fn truncate_for_error(body: &str) -> String {
    const MAX_LEN: usize = 200;
    if body.chars().count() <= MAX_LEN {
        body.to_owned()
    } else {
        format!("{}...", body.chars().take(MAX_LEN).collect::<String>())
    }
}
