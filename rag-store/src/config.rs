//! Runtime and collection configuration.
//!
//! Everything is environment-driven with per-field defaults; the only
//! required keys are the Qdrant endpoint and collection name. Missing
//! required keys are collected and reported together so a misconfigured
//! deployment fails fast with one complete message.

use crate::errors::RagError;

/// Distance function used for the vector space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceKind {
    /// Cosine distance (recommended for most embeddings).
    Cosine,
    /// Dot product (useful for normalized vectors).
    Dot,
    /// Euclidean distance (L2).
    Euclid,
}

impl DistanceKind {
    /// Parse from env string (case-insensitive). Defaults to Cosine.
    fn from_env(s: Option<String>) -> Self {
        match s
            .unwrap_or_else(|| "Cosine".to_string())
            .to_lowercase()
            .as_str()
        {
            "dot" | "dotproduct" => DistanceKind::Dot,
            "euclid" | "euclidean" | "l2" => DistanceKind::Euclid,
            _ => DistanceKind::Cosine,
        }
    }
}

/// Configuration for ingestion, retrieval, and answering.
#[derive(Clone, Debug)]
pub struct RagConfig {
    /// Qdrant gRPC endpoint, e.g. `http://localhost:6334`.
    pub qdrant_url: String,
    /// Optional API key for Qdrant Cloud.
    pub qdrant_api_key: Option<String>,
    /// Target collection name.
    pub collection: String,
    /// Distance function (Cosine by default).
    pub distance: DistanceKind,
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Characters of overlap between consecutive chunks.
    pub chunk_overlap: usize,
    /// Minimum similarity for a retrieved chunk to count as relevant.
    pub similarity_threshold: f32,
    /// Default number of neighbors to retrieve per question.
    pub top_k: u64,
    /// Expected embedding dimensionality.
    pub embedding_dim: usize,
    /// Normalize embeddings to unit length before use.
    pub normalize_embeddings: bool,
    /// Maximum embedding requests per second.
    pub embed_max_rps: f64,
    /// Upsert/delete batch size (1..=500).
    pub upsert_batch: usize,
}

impl RagConfig {
    /// Builds configuration from environment variables.
    ///
    /// Required: `QDRANT_URL`, `QDRANT_COLLECTION` — all missing required
    /// keys are enumerated in a single [`RagError::Config`].
    ///
    /// Optional (with defaults): `QDRANT_API_KEY`, `QDRANT_DISTANCE`
    /// (Cosine), `CHUNK_SIZE` (500), `CHUNK_OVERLAP` (50),
    /// `SIMILARITY_THRESHOLD` (0.7), `TOP_K_RESULTS` (3), `EMBEDDING_DIM`
    /// (1024), `EMBEDDING_NORMALIZE` (true), `EMBED_MAX_RPS` (30),
    /// `UPSERT_BATCH` (500).
    ///
    /// # Errors
    /// Returns [`RagError::Config`] listing every missing required key, or
    /// naming the first invalid value.
    pub fn from_env() -> Result<Self, RagError> {
        let mut missing: Vec<&str> = Vec::new();

        let qdrant_url = require_env("QDRANT_URL", &mut missing);
        let collection = require_env("QDRANT_COLLECTION", &mut missing);

        if !missing.is_empty() {
            return Err(RagError::Config(format!(
                "missing required configuration: {}",
                missing.join(", ")
            )));
        }

        let cfg = Self {
            qdrant_url,
            qdrant_api_key: std::env::var("QDRANT_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            collection,
            distance: DistanceKind::from_env(std::env::var("QDRANT_DISTANCE").ok()),
            chunk_size: read_usize_env("CHUNK_SIZE")?.unwrap_or(500),
            chunk_overlap: read_usize_env("CHUNK_OVERLAP")?.unwrap_or(50),
            similarity_threshold: read_f32_env("SIMILARITY_THRESHOLD")?.unwrap_or(0.7),
            top_k: read_usize_env("TOP_K_RESULTS")?.unwrap_or(3) as u64,
            embedding_dim: read_usize_env("EMBEDDING_DIM")?.unwrap_or(1024),
            normalize_embeddings: read_bool_env("EMBEDDING_NORMALIZE")?.unwrap_or(true),
            embed_max_rps: read_f32_env("EMBED_MAX_RPS")?.unwrap_or(30.0) as f64,
            upsert_batch: read_usize_env("UPSERT_BATCH")?.unwrap_or(500),
        };

        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates config values.
    ///
    /// # Errors
    /// Returns [`RagError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.qdrant_url.trim().is_empty() {
            return Err(RagError::Config("QDRANT_URL is empty".into()));
        }
        if self.collection.trim().is_empty() {
            return Err(RagError::Config("QDRANT_COLLECTION is empty".into()));
        }
        if self.chunk_size == 0 {
            return Err(RagError::Config("CHUNK_SIZE must be > 0".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(RagError::Config(
                "SIMILARITY_THRESHOLD must be within 0.0..=1.0".into(),
            ));
        }
        if self.top_k == 0 {
            return Err(RagError::Config("TOP_K_RESULTS must be > 0".into()));
        }
        if self.embedding_dim == 0 {
            return Err(RagError::Config("EMBEDDING_DIM must be > 0".into()));
        }
        if self.embed_max_rps <= 0.0 {
            return Err(RagError::Config("EMBED_MAX_RPS must be > 0".into()));
        }
        if self.upsert_batch == 0 || self.upsert_batch > 500 {
            return Err(RagError::Config(
                "UPSERT_BATCH must be within 1..=500".into(),
            ));
        }
        Ok(())
    }
}

fn require_env(name: &'static str, missing: &mut Vec<&'static str>) -> String {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => {
            missing.push(name);
            String::new()
        }
    }
}

fn read_usize_env(name: &'static str) -> Result<Option<usize>, RagError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v
            .parse::<usize>()
            .map(Some)
            .map_err(|_| RagError::Config(format!("{name} must be an integer"))),
        _ => Ok(None),
    }
}

fn read_f32_env(name: &'static str) -> Result<Option<f32>, RagError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v
            .parse::<f32>()
            .map(Some)
            .map_err(|_| RagError::Config(format!("{name} must be a number"))),
        _ => Ok(None),
    }
}

fn read_bool_env(name: &'static str) -> Result<Option<bool>, RagError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(RagError::Config(format!("{name} must be a boolean"))),
        },
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> RagConfig {
        RagConfig {
            qdrant_url: "http://localhost:6334".into(),
            qdrant_api_key: None,
            collection: "docqa".into(),
            distance: DistanceKind::Cosine,
            chunk_size: 500,
            chunk_overlap: 50,
            similarity_threshold: 0.7,
            top_k: 3,
            embedding_dim: 1024,
            normalize_embeddings: true,
            embed_max_rps: 30.0,
            upsert_batch: 500,
        }
    }

    #[test]
    fn defaults_validate() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn overlap_must_stay_below_chunk_size() {
        let mut cfg = base();
        cfg.chunk_overlap = 500;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("CHUNK_OVERLAP"));
    }

    #[test]
    fn threshold_range_enforced() {
        let mut cfg = base();
        cfg.similarity_threshold = 1.2;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn batch_capped_at_backend_limit() {
        let mut cfg = base();
        cfg.upsert_batch = 501;
        assert!(cfg.validate().is_err());
        cfg.upsert_batch = 500;
        assert!(cfg.validate().is_ok());
    }
}
