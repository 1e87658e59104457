use crate::config::llm_provider::LlmProvider;

/// Configuration for one model invocation profile.
///
/// The same struct covers generative and embedding profiles; fields that a
/// given provider or role does not use stay `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    /// The LLM provider/backend (e.g., Ollama, an OpenAI-compatible API).
    pub provider: LlmProvider,

    /// Model identifier string (e.g., `"qwen3:14b"`, `"bge-m3"`).
    pub model: String,

    /// Inference endpoint (local server or remote API URL).
    pub endpoint: String,

    /// Optional API key for providers that require authentication.
    pub api_key: Option<String>,

    /// Maximum number of tokens to generate (generative profiles).
    pub max_tokens: Option<u32>,

    /// Sampling temperature (0.0 = deterministic).
    pub temperature: Option<f32>,

    /// Nucleus sampling cutoff.
    pub top_p: Option<f32>,

    /// Requested embedding dimensionality, for APIs that accept one
    /// (embedding profiles only; Ollama ignores it).
    pub dimensions: Option<u32>,

    /// Optional request timeout in seconds.
    pub timeout_secs: Option<u64>,
}
