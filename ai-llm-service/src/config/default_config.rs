//! Default LLM configs loaded strictly from environment variables.
//!
//! This module provides convenience constructors for [`LlmModelConfig`],
//! grouped by provider and role. Two roles exist in this pipeline:
//!
//! - **Generative** → answer synthesis (bounded output, low temperature)
//! - **Embedding**  → query/chunk vectorization
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND`        = provider kind (`ollama` | `openai`), default `ollama`
//! - `LLM_MAX_TOKENS`  = optional max tokens for generation (u32, default 2000)
//! - `LLM_TEMPERATURE` = optional sampling temperature (default 0.3)
//! - `LLM_TOP_P`       = optional nucleus cutoff (default 0.9)
//!
//! Ollama:
//! - `OLLAMA_URL` or `OLLAMA_PORT` = endpoint (mandatory)
//! - `OLLAMA_MODEL`                = generative model (mandatory)
//! - `EMBEDDING_MODEL`             = embedding model (mandatory)
//!
//! OpenAI-compatible:
//! - `OPENAI_URL`     = endpoint, default `https://api.openai.com`
//! - `OPENAI_API_KEY` = API key (mandatory)
//! - `OPENAI_MODEL`   = generative model (mandatory)
//! - `EMBEDDING_MODEL` = embedding model (mandatory)
//! - `EMBEDDING_DIM`  = optional requested dimensionality

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt_f32, env_opt_u32, must_env, validate_http_endpoint,
        validate_range_f32,
    },
};

/// Resolves the configured provider kind from `LLM_KIND` (default: Ollama).
///
/// # Errors
/// Returns [`ConfigError::UnsupportedProvider`] for unknown values.
pub fn provider_kind() -> Result<LlmProvider, AiLlmError> {
    match std::env::var("LLM_KIND") {
        Ok(v) if !v.trim().is_empty() => LlmProvider::parse(&v),
        _ => Ok(LlmProvider::Ollama),
    }
}

/// Constructs the **generative** profile from the environment.
///
/// Low temperature and bounded output: the answer synthesizer favors
/// grounded, deterministic text over creativity.
///
/// # Errors
/// Propagates missing/invalid environment variables.
pub fn config_generative() -> Result<LlmModelConfig, AiLlmError> {
    let provider = provider_kind()?;
    let max_tokens = env_opt_u32("LLM_MAX_TOKENS")?.or(Some(2000));
    let temperature = env_opt_f32("LLM_TEMPERATURE")?.or(Some(0.3));
    let top_p = env_opt_f32("LLM_TOP_P")?.or(Some(0.9));
    if let Some(t) = temperature {
        validate_range_f32("temperature", t, 0.0, 2.0)?;
    }
    if let Some(p) = top_p {
        validate_range_f32("top_p", p, 0.0, 1.0)?;
    }

    match provider {
        LlmProvider::Ollama => Ok(LlmModelConfig {
            provider,
            model: must_env("OLLAMA_MODEL")?,
            endpoint: ollama_endpoint()?,
            api_key: None,
            max_tokens,
            temperature,
            top_p,
            dimensions: None,
            timeout_secs: Some(600),
        }),
        LlmProvider::OpenAi => Ok(LlmModelConfig {
            provider,
            model: must_env("OPENAI_MODEL")?,
            endpoint: openai_endpoint()?,
            api_key: Some(must_env("OPENAI_API_KEY")?),
            max_tokens,
            temperature,
            top_p,
            dimensions: None,
            timeout_secs: Some(120),
        }),
    }
}

/// Constructs the **embedding** profile from the environment.
///
/// # Errors
/// Propagates missing/invalid environment variables.
pub fn config_embedding() -> Result<LlmModelConfig, AiLlmError> {
    let provider = provider_kind()?;
    let model = must_env("EMBEDDING_MODEL")?;
    let dimensions = env_opt_u32("EMBEDDING_DIM")?;

    match provider {
        LlmProvider::Ollama => Ok(LlmModelConfig {
            provider,
            model,
            endpoint: ollama_endpoint()?,
            api_key: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            // Ollama's embeddings endpoint has no dimensions parameter;
            // callers enforce dimensionality on the response instead.
            dimensions: None,
            timeout_secs: Some(30),
        }),
        LlmProvider::OpenAi => Ok(LlmModelConfig {
            provider,
            model,
            endpoint: openai_endpoint()?,
            api_key: Some(must_env("OPENAI_API_KEY")?),
            max_tokens: None,
            temperature: None,
            top_p: None,
            dimensions,
            timeout_secs: Some(30),
        }),
    }
}

/// Resolves the Ollama endpoint strictly from environment.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
///
/// # Errors
/// - [`ConfigError::MissingVar`] if both are missing
/// - [`ConfigError::InvalidNumber`] if `OLLAMA_PORT` is invalid
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Ok(url) = std::env::var("OLLAMA_URL") {
        if !url.trim().is_empty() {
            validate_http_endpoint("OLLAMA_URL", url.trim())?;
            return Ok(url);
        }
    }
    if let Ok(port) = std::env::var("OLLAMA_PORT") {
        if !port.trim().is_empty() {
            let _ = port
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidNumber {
                    var: "OLLAMA_PORT",
                    reason: "expected u16 (1..=65535)",
                })?;
            return Ok(format!("http://localhost:{port}"));
        }
    }
    Err(AiLlmError::Config(ConfigError::MissingVar(
        "OLLAMA_URL or OLLAMA_PORT",
    )))
}

/// Resolves the OpenAI-compatible endpoint (`OPENAI_URL`, with the public
/// API as default).
fn openai_endpoint() -> Result<String, AiLlmError> {
    match std::env::var("OPENAI_URL") {
        Ok(url) if !url.trim().is_empty() => {
            validate_http_endpoint("OPENAI_URL", url.trim())?;
            Ok(url)
        }
        _ => Ok("https://api.openai.com".to_string()),
    }
}
