//! Lightweight Ollama client for text generation and embeddings.
//!
//! Thin wrapper over the local Ollama API:
//! - `POST {endpoint}/api/generate`   — synchronous text generation (`stream=false`)
//! - `POST {endpoint}/api/embeddings` — embeddings retrieval
//!
//! Every call runs under the crate-wide [`RetryPolicy`]: throttling and
//! transient transport failures are retried with exponential backoff and
//! jitter before escalating.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{AiLlmError, ConfigError, validate_http_endpoint};
use crate::retry::RetryPolicy;

/// Thin client for Ollama.
///
/// Initialized with a full [`LlmModelConfig`]. Reuses one HTTP client with
/// a configurable timeout.
pub struct OllamaService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    retry: RetryPolicy,
    url_generate: String,
    url_embeddings: String,
}

impl OllamaService {
    /// Creates a new [`OllamaService`] from the given config.
    ///
    /// # Errors
    /// - [`ConfigError::UnsupportedProvider`] if `cfg.provider` is not Ollama
    /// - [`ConfigError::InvalidFormat`] if `cfg.endpoint` is invalid
    /// - [`AiLlmError::Transport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig, retry: RetryPolicy) -> Result<Self, AiLlmError> {
        if cfg.provider != LlmProvider::Ollama {
            return Err(ConfigError::UnsupportedProvider(format!("{:?}", cfg.provider)).into());
        }
        validate_http_endpoint("OLLAMA_URL", cfg.endpoint.trim())?;

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?;

        let base = cfg.endpoint.trim().trim_end_matches('/').to_string();
        let url_generate = format!("{}/api/generate", base);
        let url_embeddings = format!("{}/api/embeddings", base);

        Ok(Self {
            client,
            cfg,
            retry,
            url_generate,
            url_embeddings,
        })
    }

    /// Performs a **non-streaming** generation request via `/api/generate`.
    ///
    /// Mapped options:
    /// - `model`        ← `self.cfg.model`
    /// - `prompt`       ← argument
    /// - `num_predict`  ← `self.cfg.max_tokens`
    /// - `temperature`  ← `self.cfg.temperature`
    /// - `top_p`        ← `self.cfg.top_p`
    ///
    /// # Errors
    /// - [`AiLlmError::HttpStatus`] for non-2xx responses (after retries)
    /// - [`AiLlmError::Transport`] for client errors (after retries)
    /// - [`AiLlmError::Decode`] if the response cannot be parsed
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn generate(&self, prompt: &str) -> Result<String, AiLlmError> {
        self.retry
            .run("generate", || async move {
                let body = GenerateRequest::from_cfg(&self.cfg, prompt);

                debug!("POST {}", self.url_generate);
                let resp = self
                    .client
                    .post(&self.url_generate)
                    .json(&body)
                    .send()
                    .await?;

                if !resp.status().is_success() {
                    return Err(http_status_error(resp, &self.url_generate).await);
                }

                let out: GenerateResponse = resp.json().await.map_err(|e| {
                    AiLlmError::Decode(format!(
                        "serde error: {e}; ensure `stream=false` is used"
                    ))
                })?;

                Ok(out.response)
            })
            .await
    }

    /// Retrieves embeddings via `/api/embeddings`.
    ///
    /// Ollama has no dimensions parameter; callers validate the returned
    /// vector length themselves.
    ///
    /// # Errors
    /// - [`AiLlmError::HttpStatus`] for non-2xx responses (after retries)
    /// - [`AiLlmError::Transport`] for client errors (after retries)
    /// - [`AiLlmError::Decode`] if the response cannot be parsed
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn embeddings(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        self.retry
            .run("embeddings", || async move {
                let body = EmbeddingsRequest {
                    model: &self.cfg.model,
                    prompt: input,
                };

                debug!("POST {}", self.url_embeddings);
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
                        "serde error: {e}; expected `{{ embedding: number[] }}`"
                    ))
                })?;

                Ok(out.embedding)
            })
            .await
    }
}

/// Builds an [`AiLlmError::HttpStatus`] from a failed response, keeping a
/// short body snippet for diagnostics.
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

/// Request body for `/api/generate` (non-streaming).
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

impl<'a> GenerateRequest<'a> {
    fn from_cfg(cfg: &'a LlmModelConfig, prompt: &'a str) -> Self {
        let options = GenerateOptions {
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            num_predict: cfg.max_tokens,
        };

        Self {
            model: &cfg.model,
            prompt,
            stream: false,
            options: Some(options),
        }
    }
}

/// Subset of Ollama `options`; extend as needed (top_k, stop sequences, …).
#[derive(Debug, Default, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Response body for `/api/generate`; the generated text is in `response`.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Request body for `/api/embeddings`.
#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Response body for `/api/embeddings`.
#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}
