//! OpenAI-compatible client for chat completions and embeddings.
//!
//! Minimal non-streaming client over the REST API:
//! - `POST {endpoint}/v1/chat/completions` — text generation
//! - `POST {endpoint}/v1/embeddings`       — embeddings retrieval
//!
//! The bearer token is installed once as a default header. Calls run under
//! the crate-wide [`RetryPolicy`].

use std::time::Duration;

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{AiLlmError, ConfigError, validate_http_endpoint};
use crate::retry::RetryPolicy;

/// Thin client for an OpenAI-compatible API.
pub struct OpenAiService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    retry: RetryPolicy,
    url_chat: String,
    url_embeddings: String,
}

impl OpenAiService {
    /// Creates a new [`OpenAiService`] from the given config.
    ///
    /// # Errors
    /// - [`ConfigError::UnsupportedProvider`] if `cfg.provider` is not OpenAI
    /// - [`ConfigError::MissingVar`] if no API key is configured
    /// - [`AiLlmError::Transport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig, retry: RetryPolicy) -> Result<Self, AiLlmError> {
        if cfg.provider != LlmProvider::OpenAi {
            return Err(ConfigError::UnsupportedProvider(format!("{:?}", cfg.provider)).into());
        }
        validate_http_endpoint("OPENAI_URL", cfg.endpoint.trim())?;

        let api_key = cfg
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingVar("OPENAI_API_KEY"))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| AiLlmError::Decode(format!("invalid API key header: {e}")))?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        let base = cfg.endpoint.trim().trim_end_matches('/').to_string();
        let url_chat = format!("{}/v1/chat/completions", base);
        let url_embeddings = format!("{}/v1/embeddings", base);

        Ok(Self {
            client,
            cfg,
            retry,
            url_chat,
            url_embeddings,
        })
    }

    /// Performs a **non-streaming** chat completion request.
    ///
    /// Builds a minimal `messages` array: an optional system message plus
    /// the user prompt. Mapped options from config: `model`, `temperature`,
    /// `top_p`, `max_tokens`.
    ///
    /// # Errors
    /// - [`AiLlmError::HttpStatus`] for non-2xx responses (after retries)
    /// - [`AiLlmError::Transport`] for client/network failures (after retries)
    /// - [`AiLlmError::Decode`] if the JSON cannot be parsed
    /// - [`AiLlmError::EmptyResponse`] if no choices come back
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn generate(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<String, AiLlmError> {
        self.retry
            .run("generate", || async move {
                let body = ChatCompletionRequest::from_cfg(&self.cfg, prompt, system);

                debug!(prompt_len = prompt.len(), "POST {}", self.url_chat);
                let resp = self.client.post(&self.url_chat).json(&body).send().await?;

                if !resp.status().is_success() {
                    return Err(http_status_error(resp, &self.url_chat).await);
                }

                let out: ChatCompletionResponse = resp.json().await.map_err(|e| {
                    AiLlmError::Decode(format!(
                        "serde error: {e}; expected `choices[0].message.content`"
                    ))
                })?;

                out.choices
                    .into_iter()
                    .find_map(|c| c.message.content)
                    .ok_or(AiLlmError::EmptyResponse)
            })
            .await
    }

    /// Retrieves a single embeddings vector via `/v1/embeddings`.
    ///
    /// Passes the configured `dimensions` through when set, for models that
    /// support shortened output vectors.
    ///
    /// # Errors
    /// - [`AiLlmError::HttpStatus`] for non-2xx responses (after retries)
    /// - [`AiLlmError::Transport`] for client/network failures (after retries)
    /// - [`AiLlmError::Decode`] if the JSON cannot be parsed
    /// - [`AiLlmError::EmptyResponse`] if the data array is empty
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn embeddings(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        self.retry
            .run("embeddings", || async move {
                let body = EmbeddingsRequest {
                    model: &self.cfg.model,
                    input,
                    dimensions: self.cfg.dimensions,
                };

                debug!(input_len = input.len(), "POST {}", self.url_embeddings);
                let resp = self
                    .client
                    .post(&self.url_embeddings)
                    .json(&body)
                    .send()
                    .await?;

                if !resp.status().is_success() {
                    return Err(http_status_error(resp, &self.url_embeddings).await);
                }

                let out: EmbeddingsResponse = resp.json().await.map_err(|e| {
                    AiLlmError::Decode(format!(
                        "serde error: {e}; expected `data[0].embedding`"
                    ))
                })?;

                out.data
                    .into_iter()
                    .next()
                    .map(|d| d.embedding)
                    .ok_or(AiLlmError::EmptyResponse)
            })
            .await
    }
}

async fn http_status_error(resp: reqwest::Response, url: &str) -> AiLlmError {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let snippet = text.chars().take(240).collect::<String>();
    AiLlmError::HttpStatus {
        status,
        url: url.to_string(),
        snippet,
    }
}

/// Request body for `/v1/chat/completions` (non-streaming).
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

impl<'a> ChatCompletionRequest<'a> {
    fn from_cfg(cfg: &'a LlmModelConfig, prompt: &'a str, system: Option<&'a str>) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(sys) = system {
            messages.push(ChatMessage {
                role: "system",
                content: sys,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        Self {
            model: &cfg.model,
            messages,
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
            top_p: cfg.top_p,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Response body for `/v1/chat/completions` (the parts we read).
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Request body for `/v1/embeddings`.
#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<u32>,
}

/// Response body for `/v1/embeddings` (the parts we read).
#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingsDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsDatum {
    embedding: Vec<f32>,
}
