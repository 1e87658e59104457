use crate::error_handler::{AiLlmError, ConfigError};

/// Backend used for model inference and embeddings.
///
/// Adding more providers later (e.g., a local GGUF runner) means extending
/// this enum plus one service client under `services/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// Local Ollama runtime (`/api/generate`, `/api/embeddings`).
    Ollama,
    /// OpenAI-compatible HTTP API (`/v1/chat/completions`, `/v1/embeddings`).
    OpenAi,
}

impl LlmProvider {
    /// Parses a provider kind from an env value (case-insensitive).
    ///
    /// # Errors
    /// Returns [`ConfigError::UnsupportedProvider`] for unknown values.
    pub fn parse(s: &str) -> Result<Self, AiLlmError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            "openai" | "chatgpt" => Ok(LlmProvider::OpenAi),
            other => Err(ConfigError::UnsupportedProvider(other.to_string()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_providers() {
        assert_eq!(LlmProvider::parse("ollama").unwrap(), LlmProvider::Ollama);
        assert_eq!(LlmProvider::parse("OpenAI").unwrap(), LlmProvider::OpenAi);
        assert!(LlmProvider::parse("bedrock").is_err());
    }
}
