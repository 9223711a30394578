use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use super::CompletionBackend;
use crate::error::FixError;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Categories whose blocking threshold is relaxed. Error reports routinely
/// contain `eval`, `exec`, shell commands and stack traces that the service
/// would otherwise refuse.
const RELAXED_CATEGORIES: [&str; 2] = ["HARM_CATEGORY_DANGEROUS_CONTENT", "HARM_CATEGORY_HARASSMENT"];

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize, Debug)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize, Debug)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Serialize, Debug)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Deserialize, Debug, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug, Default)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Value>,
}

/// Production backend: Gemini `generateContent` over HTTPS.
#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
    config: GeminiConfig,
    endpoint: String,
}

impl GeminiBackend {
    pub fn new(config: GeminiConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let endpoint = config.endpoint();
        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    fn request_body<'a>(&self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.config.max_output_tokens,
                temperature: self.config.temperature,
            },
            safety_settings: RELAXED_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
        }
    }
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // api_key stays out of debug output
        f.debug_struct("GeminiBackend")
            .field("endpoint", &self.endpoint)
            .field("max_output_tokens", &self.config.max_output_tokens)
            .field("temperature", &self.config.temperature)
            .finish()
    }
}

#[async_trait]
impl CompletionBackend for GeminiBackend {
    async fn generate(&self, prompt: &str) -> Result<String, FixError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                error!(
                    event = "completion_transport_failed",
                    timeout = e.is_timeout(),
                    connect = e.is_connect(),
                    error = %e,
                );
                FixError::ServiceUnavailable
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            error!(event = "completion_body_unreadable", status, error = %e);
            FixError::ServiceUnavailable
        })?;

        info!(
            event = "completion_reply",
            status,
            body_bytes = body.len(),
            model = %self.config.model,
        );

        interpret_reply(status, &body)
    }
}

/// Maps an upstream HTTP reply onto the gateway's result.
///
/// Non-2xx is `UpstreamError(status)`. A 2xx body without a first candidate
/// text part is `IncompleteAnswer` (safety blocks and `MAX_TOKENS` cut-offs
/// both look like this).
pub fn interpret_reply(status: u16, body: &str) -> Result<String, FixError> {
    if !(200..300).contains(&status) {
        return Err(FixError::UpstreamError(status));
    }

    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|_| FixError::IncompleteAnswer)?;

    parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.get("text").and_then(Value::as_str).map(str::to_string))
        .ok_or(FixError::IncompleteAnswer)
}
