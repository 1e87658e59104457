//! Shared LLM service layer: provider clients, unified errors, retry policy,
//! and the two runtime profiles used by the document Q&A pipeline
//! (**generative** for answer synthesis, **embedding** for vectorization).
//!
//! Construct [`service_profiles::LlmServiceProfiles`] once, wrap it in an
//! `Arc`, and hand clones to whoever needs text generation or embeddings.

pub mod config;
pub mod error_handler;
pub mod retry;
pub mod service_profiles;
pub mod services;

pub use config::llm_model_config::LlmModelConfig;
pub use config::llm_provider::LlmProvider;
pub use error_handler::{AiLlmError, ConfigError};
pub use retry::RetryPolicy;
pub use service_profiles::LlmServiceProfiles;
