//! Provider clients. One module per backend.

pub mod ollama_service;
pub mod open_ai_service;
