//! Vector store adapter over `qdrant-client`.
//!
//! This facade concentrates all Qdrant interactions behind a minimal API,
//! hiding away the verbose builder pattern and keeping the rest of the
//! application decoupled from `qdrant-client`: batched writes and deletes,
//! similarity search, complete enumeration via scroll pagination, and the
//! collection lifecycle.
//!
//! Point ids are deterministic UUIDv5 values derived from the logical key
//! (the chunk id); the chunk id itself always travels in the payload, so
//! listings and deletions speak the logical key, never raw point ids.

use std::collections::BTreeMap;

use indicatif::{ProgressBar, ProgressStyle};
use qdrant_client::qdrant::{
    CollectionStatus, Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    PointId, PointStruct, PointsIdsList, ScrollPointsBuilder, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;
use tokio::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{DistanceKind, RagConfig};
use crate::document::{
    Chunk, DeleteOutcome, DocumentSummary, IndexLifecycle, ListedVector, PutOutcome,
    RetrievedChunk, RetrievedMetadata, SourceType,
};
use crate::errors::RagError;
use crate::reporter::Reporter;

/// Backend batch ceiling for writes and deletes.
const MAX_BATCH: usize = 500;
/// Page size for full enumeration.
const SCROLL_PAGE: u32 = 500;
/// Bounded status polling after collection creation.
const STATUS_POLL_ATTEMPTS: u32 = 15;
const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Single bounded wait before retrying a throttled batch.
const THROTTLE_PAUSE: Duration = Duration::from_secs(2);

/// Readiness of the backing collection, as reported by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexStatus {
    Ready,
    Pending,
    Unknown,
}

/// A facade over the Qdrant client to keep the rest of the code clean and
/// stable.
pub struct QdrantFacade {
    client: Qdrant,
    collection: String,
    distance: DistanceKind,
    upsert_batch: usize,
}

impl QdrantFacade {
    /// Creates a new facade from the given configuration.
    ///
    /// # Errors
    /// Returns `RagError::Qdrant` if the client cannot be constructed.
    pub fn new(cfg: &RagConfig) -> Result<Self, RagError> {
        cfg.validate()?;

        let mut builder = Qdrant::from_url(&cfg.qdrant_url);
        if let Some(key) = &cfg.qdrant_api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder.build().map_err(|e| RagError::qdrant("connect", e))?;

        Ok(Self {
            client,
            collection: cfg.collection.clone(),
            distance: cfg.distance,
            upsert_batch: cfg.upsert_batch.clamp(1, MAX_BATCH),
        })
    }

    /// Ensures the collection exists, creating it idempotently.
    ///
    /// After a fresh create the status is polled a bounded number of times;
    /// a collection that never reports ready is treated as a soft success
    /// with a warning, since writes will surface any real problem.
    ///
    /// # Errors
    /// Returns `RagError::Qdrant` on unexpected backend failures.
    pub async fn ensure_index(
        &self,
        dimension: usize,
        reporter: &dyn Reporter,
    ) -> Result<(), RagError> {
        info!(
            collection = %self.collection,
            dimension,
            distance = ?self.distance,
            "ensuring collection"
        );

        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| RagError::qdrant("ensure_index", e))?;
        if exists {
            debug!(collection = %self.collection, "collection already exists");
            return Ok(());
        }

        let created = self
            .client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(
                    VectorParamsBuilder::new(dimension as u64, to_qdrant_distance(self.distance)),
                ),
            )
            .await;

        if let Err(e) = created {
            // A concurrent creator is fine; anything else is not.
            let msg = e.to_string();
            if msg.to_lowercase().contains("already exists") {
                debug!(collection = %self.collection, "collection created concurrently");
                return Ok(());
            }
            return Err(RagError::qdrant("ensure_index", msg));
        }

        for attempt in 1..=STATUS_POLL_ATTEMPTS {
            match self.index_status().await {
                IndexStatus::Ready => {
                    info!(collection = %self.collection, attempt, "collection ready");
                    return Ok(());
                }
                status => {
                    debug!(collection = %self.collection, attempt, ?status, "collection not ready yet");
                    tokio::time::sleep(STATUS_POLL_INTERVAL).await;
                }
            }
        }

        reporter.warn(&format!(
            "collection '{}' did not report ready after {} checks; proceeding optimistically",
            self.collection, STATUS_POLL_ATTEMPTS
        ));
        Ok(())
    }

    /// Current collection status mapped onto [`IndexStatus`].
    async fn index_status(&self) -> IndexStatus {
        match self.client.collection_info(&self.collection).await {
            Ok(resp) => match resp.result {
                Some(info) => match CollectionStatus::try_from(info.status) {
                    Ok(CollectionStatus::Green) => IndexStatus::Ready,
                    Ok(CollectionStatus::Yellow) => IndexStatus::Pending,
                    _ => IndexStatus::Unknown,
                },
                None => IndexStatus::Unknown,
            },
            Err(_) => IndexStatus::Unknown,
        }
    }

    /// Stores chunk/embedding pairs, skipping failed embeddings.
    ///
    /// Requires `chunks.len() == embeddings.len()`. Positions whose
    /// embedding is `None` are excluded from persistence (a chunk is never
    /// stored with a placeholder vector). Writes are batched; a throttled
    /// batch gets one bounded wait-and-retry before the failure propagates.
    ///
    /// # Errors
    /// - [`RagError::Validation`] on length mismatch or zero valid pairs
    /// - [`RagError::VectorSizeMismatch`] if a vector has the wrong size
    /// - [`RagError::Qdrant`] on backend failures
    pub async fn put_vectors(
        &self,
        chunks: &[Chunk],
        embeddings: &[Option<Vec<f32>>],
        dimension: usize,
        reporter: &dyn Reporter,
    ) -> Result<PutOutcome, RagError> {
        let valid = pair_valid(chunks, embeddings)?;

        for (_, vector) in &valid {
            if vector.len() != dimension {
                return Err(RagError::VectorSizeMismatch {
                    got: vector.len(),
                    want: dimension,
                });
            }
        }

        let batches = batch_count(valid.len(), self.upsert_batch);
        info!(
            collection = %self.collection,
            total = valid.len(),
            batches,
            "storing vectors"
        );

        let pb = progress_bar(batches);
        for batch in valid.chunks(self.upsert_batch) {
            let points: Vec<PointStruct> = batch
                .iter()
                .map(|(chunk, vector)| build_point(chunk, vector))
                .collect::<Result<_, _>>()?;

            self.upsert_with_throttle_retry(points, reporter).await?;
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        Ok(PutOutcome {
            total_stored: valid.len(),
            batches,
        })
    }

    async fn upsert_with_throttle_retry(
        &self,
        points: Vec<PointStruct>,
        reporter: &dyn Reporter,
    ) -> Result<(), RagError> {
        let first = self
            .client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points.clone()).wait(true))
            .await;

        match first {
            Ok(_) => Ok(()),
            Err(e) if is_throttled(&e.to_string()) => {
                reporter.warn("backend throttled the write; waiting 2s before one retry");
                tokio::time::sleep(THROTTLE_PAUSE).await;
                self.client
                    .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
                    .await
                    .map(|_| ())
                    .map_err(|e| RagError::qdrant("put_vectors", e))
            }
            Err(e) => Err(RagError::qdrant("put_vectors", e)),
        }
    }

    /// Nearest-neighbor search, optionally restricted to one document.
    ///
    /// Results come back ordered by descending similarity (ascending
    /// distance); ties keep backend order.
    ///
    /// # Errors
    /// - [`RagError::Validation`] if `top_k == 0`
    /// - [`RagError::Qdrant`] on backend failures
    pub async fn query(
        &self,
        vector: Vec<f32>,
        top_k: u64,
        document_filter: Option<&str>,
    ) -> Result<Vec<RetrievedChunk>, RagError> {
        if top_k == 0 {
            return Err(RagError::Validation("top_k must be > 0".into()));
        }

        let mut builder =
            SearchPointsBuilder::new(&self.collection, vector, top_k).with_payload(true);
        if let Some(document) = document_filter {
            builder = builder.filter(Filter::must([Condition::matches(
                "document",
                document.to_string(),
            )]));
        }

        let resp = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| RagError::qdrant("query", e))?;

        let hits = resp
            .result
            .into_iter()
            .map(|scored| {
                let payload = payload_to_json(scored.payload);
                scored_to_retrieved(scored.score, &payload)
            })
            .collect::<Vec<_>>();

        debug!(hits = hits.len(), "query completed");
        Ok(hits)
    }

    /// Enumerates the complete index via scroll pagination.
    ///
    /// Loops until the backend stops returning a continuation offset, so
    /// the listing is exhaustive regardless of index size.
    ///
    /// # Errors
    /// Returns `RagError::Qdrant` on backend failures.
    pub async fn list_all(&self) -> Result<Vec<ListedVector>, RagError> {
        let mut vectors = Vec::new();
        let mut offset: Option<PointId> = None;
        let mut pages = 0usize;

        loop {
            let mut builder = ScrollPointsBuilder::new(&self.collection)
                .limit(SCROLL_PAGE)
                .with_payload(true)
                .with_vectors(false);
            if let Some(off) = offset.take() {
                builder = builder.offset(off);
            }

            let resp = self
                .client
                .scroll(builder)
                .await
                .map_err(|e| RagError::qdrant("list_all", e))?;

            pages += 1;
            for point in resp.result {
                let id = point_id_to_string(point.id.as_ref());
                let payload = payload_to_json(point.payload);
                vectors.push(listed_from(id, &payload));
            }

            match resp.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        debug!(total = vectors.len(), pages, "listed all vectors");
        Ok(vectors)
    }

    /// Deletes vectors by their logical keys (chunk ids), in batches.
    ///
    /// A throttled batch gets one bounded wait-and-retry. Deleting an
    /// already-absent key is a no-op for the backend, so the operation is
    /// idempotent.
    ///
    /// # Errors
    /// Returns `RagError::Qdrant` on backend failures.
    pub async fn delete_by_keys(
        &self,
        keys: &[String],
        reporter: &dyn Reporter,
    ) -> Result<DeleteOutcome, RagError> {
        if keys.is_empty() {
            return Ok(DeleteOutcome { deleted_count: 0 });
        }

        let batches = batch_count(keys.len(), MAX_BATCH);
        info!(total = keys.len(), batches, "deleting vectors");

        let pb = progress_bar(batches);
        let mut deleted = 0usize;
        for batch in keys.chunks(MAX_BATCH) {
            let ids: Vec<PointId> = batch
                .iter()
                .map(|key| PointId::from(stable_point_id(key)))
                .collect();

            self.delete_with_throttle_retry(ids, reporter).await?;
            deleted += batch.len();
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        Ok(DeleteOutcome {
            deleted_count: deleted,
        })
    }

    async fn delete_with_throttle_retry(
        &self,
        ids: Vec<PointId>,
        reporter: &dyn Reporter,
    ) -> Result<(), RagError> {
        let first = self
            .client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(PointsIdsList { ids: ids.clone() })
                    .wait(true),
            )
            .await;

        match first {
            Ok(_) => Ok(()),
            Err(e) if is_throttled(&e.to_string()) => {
                reporter.warn("backend throttled the delete; waiting 2s before one retry");
                tokio::time::sleep(THROTTLE_PAUSE).await;
                self.client
                    .delete_points(
                        DeletePointsBuilder::new(&self.collection)
                            .points(PointsIdsList { ids })
                            .wait(true),
                    )
                    .await
                    .map(|_| ())
                    .map_err(|e| RagError::qdrant("delete_by_keys", e))
            }
            Err(e) => Err(RagError::qdrant("delete_by_keys", e)),
        }
    }

    /// Deletes every vector belonging to one document.
    ///
    /// Implemented as list-filter-delete: O(index size) per call, which is
    /// acceptable at this system's scale.
    ///
    /// # Errors
    /// Returns `RagError::Qdrant` on backend failures.
    pub async fn delete_by_document(
        &self,
        document: &str,
        reporter: &dyn Reporter,
    ) -> Result<DeleteOutcome, RagError> {
        let all = self.list_all().await?;
        let keys = keys_matching_document(&all, document);

        if keys.is_empty() {
            info!(document, "no vectors found for document");
            return Ok(DeleteOutcome { deleted_count: 0 });
        }

        self.delete_by_keys(&keys, reporter).await
    }

    /// Deletes every vector in the index.
    ///
    /// # Errors
    /// Returns `RagError::Qdrant` on backend failures.
    pub async fn delete_all(&self, reporter: &dyn Reporter) -> Result<DeleteOutcome, RagError> {
        let all = self.list_all().await?;
        let keys: Vec<String> = all.into_iter().map(|v| v.key).collect();
        self.delete_by_keys(&keys, reporter).await
    }

    /// Lists stored documents with chunk and page counts, sorted by name.
    ///
    /// # Errors
    /// Returns `RagError::Qdrant` on backend failures.
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>, RagError> {
        let all = self.list_all().await?;
        Ok(group_documents(all))
    }

    /// Deletes the backing collection. "Not found" is a distinct outcome,
    /// not an error.
    ///
    /// # Errors
    /// Returns `RagError::Qdrant` on unexpected backend failures.
    pub async fn delete_index(&self) -> Result<IndexLifecycle, RagError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| RagError::qdrant("delete_index", e))?;
        if !exists {
            warn!(collection = %self.collection, "collection not found");
            return Ok(IndexLifecycle::NotFound);
        }

        self.client
            .delete_collection(&self.collection)
            .await
            .map_err(|e| RagError::qdrant("delete_index", e))?;

        info!(collection = %self.collection, "collection deleted");
        Ok(IndexLifecycle::Deleted)
    }
}

/// Pairs chunks with their successful embeddings, preserving order.
///
/// # Errors
/// - [`RagError::Validation`] if lengths differ or nothing valid remains.
fn pair_valid<'a>(
    chunks: &'a [Chunk],
    embeddings: &'a [Option<Vec<f32>>],
) -> Result<Vec<(&'a Chunk, &'a Vec<f32>)>, RagError> {
    if chunks.len() != embeddings.len() {
        return Err(RagError::Validation(format!(
            "chunks ({}) and embeddings ({}) must have the same length",
            chunks.len(),
            embeddings.len()
        )));
    }

    let valid: Vec<(&Chunk, &Vec<f32>)> = chunks
        .iter()
        .zip(embeddings.iter())
        .filter_map(|(c, e)| e.as_ref().map(|v| (c, v)))
        .collect();

    if valid.is_empty() {
        return Err(RagError::Validation(
            "no valid embeddings to store".into(),
        ));
    }

    Ok(valid)
}

/// Number of batches needed for `total` items at `batch_size` per batch.
fn batch_count(total: usize, batch_size: usize) -> usize {
    total.div_ceil(batch_size.max(1))
}

/// Deterministic UUIDv5 point id from the logical key.
fn stable_point_id(key: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes()).to_string()
}

/// Builds a Qdrant point: uuid5 id, dense vector, flat string payload.
/// Page and chunk index are string-encoded to keep the payload uniform.
fn build_point(chunk: &Chunk, vector: &[f32]) -> Result<PointStruct, RagError> {
    let payload = json!({
        "content": chunk.content,
        "document": chunk.metadata.document,
        "page": chunk.metadata.page.to_string(),
        "chunk_index": chunk.metadata.chunk_index.to_string(),
        "source_type": chunk.metadata.source_type.as_str(),
        "chunk_id": chunk.metadata.chunk_id,
    });
    let payload = Payload::try_from(payload)
        .map_err(|e| RagError::qdrant("put_vectors", format!("payload convert: {e}")))?;

    Ok(PointStruct::new(
        stable_point_id(&chunk.metadata.chunk_id),
        vector.to_vec(),
        payload,
    ))
}

/// Converts a Qdrant payload map into plain JSON.
fn payload_to_json(
    payload: std::collections::HashMap<String, qdrant_client::qdrant::Value>,
) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (k, v) in payload {
        map.insert(k, v.into_json());
    }
    serde_json::Value::Object(map)
}

/// Maps one scored point into a [`RetrievedChunk`].
///
/// Qdrant's cosine score is a similarity, so `distance = 1 - score` keeps
/// the `similarity = 1 - distance` identity exact.
fn scored_to_retrieved(score: f32, payload: &serde_json::Value) -> RetrievedChunk {
    let similarity = score;
    let distance = 1.0 - score;

    let text = |key: &str| {
        payload
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    RetrievedChunk {
        content: text("content"),
        metadata: RetrievedMetadata {
            document: text("document"),
            page: payload
                .get("page")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
            chunk_index: payload
                .get("chunk_index")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            source_type: SourceType::parse(&text("source_type")),
            chunk_id: text("chunk_id"),
        },
        distance,
        similarity,
    }
}

/// Builds a listing entry from a point id and its payload; the logical key
/// comes from the payload, with the raw point id as fallback.
fn listed_from(point_id: String, payload: &serde_json::Value) -> ListedVector {
    let text = |key: &str| {
        payload
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    let key = match text("chunk_id") {
        k if k.is_empty() => point_id,
        k => k,
    };

    ListedVector {
        key,
        document: text("document"),
        page: payload
            .get("page")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok()),
        source_type: text("source_type"),
    }
}

/// Logical keys of all vectors with an exact `document` match.
fn keys_matching_document(vectors: &[ListedVector], document: &str) -> Vec<String> {
    vectors
        .iter()
        .filter(|v| v.document == document)
        .map(|v| v.key.clone())
        .collect()
}

/// Groups listed vectors by document name; result sorted by name, pages
/// ascending and de-duplicated.
fn group_documents(vectors: Vec<ListedVector>) -> Vec<DocumentSummary> {
    let mut grouped: BTreeMap<String, (String, usize, Vec<u32>)> = BTreeMap::new();

    for v in vectors {
        let entry = grouped
            .entry(v.document.clone())
            .or_insert_with(|| (v.source_type.clone(), 0, Vec::new()));
        entry.1 += 1;
        if let Some(page) = v.page {
            entry.2.push(page);
        }
    }

    grouped
        .into_iter()
        .map(|(document, (source_type, chunk_count, mut pages))| {
            pages.sort_unstable();
            pages.dedup();
            DocumentSummary {
                document,
                source_type,
                chunk_count,
                page_count: pages.len(),
                pages,
            }
        })
        .collect()
}

/// Whether a backend error message looks like throttling.
fn is_throttled(message: &str) -> bool {
    let msg = message.to_lowercase();
    msg.contains("resourceexhausted")
        || msg.contains("too many requests")
        || msg.contains("rate limit")
        || msg.contains("429")
}

fn to_qdrant_distance(kind: DistanceKind) -> Distance {
    match kind {
        DistanceKind::Cosine => Distance::Cosine,
        DistanceKind::Dot => Distance::Dot,
        DistanceKind::Euclid => Distance::Euclid,
    }
}

/// Progress bar over batches; only shown for multi-batch operations.
fn progress_bar(batches: usize) -> Option<ProgressBar> {
    if batches <= 1 {
        return None;
    }
    let pb = ProgressBar::new(batches as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
        )
        .unwrap()
        .progress_chars("##-"),
    );
    Some(pb)
}

fn point_id_to_string(id: Option<&PointId>) -> String {
    use qdrant_client::qdrant::point_id::PointIdOptions;
    match id.and_then(|pid| pid.point_id_options.as_ref()) {
        Some(PointIdOptions::Uuid(u)) => u.clone(),
        Some(PointIdOptions::Num(n)) => n.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ChunkMetadata;

    fn chunk(id: &str, document: &str, page: u32) -> Chunk {
        Chunk {
            content: format!("content of {id}"),
            metadata: ChunkMetadata {
                document: document.to_string(),
                page,
                source_type: SourceType::Txt,
                chunk_id: id.to_string(),
                chunk_index: 0,
                total_chunks: 1,
                chunk_size: 10,
            },
        }
    }

    fn listed(key: &str, document: &str, page: u32) -> ListedVector {
        ListedVector {
            key: key.to_string(),
            document: document.to_string(),
            page: Some(page),
            source_type: "txt".to_string(),
        }
    }

    #[test]
    fn pair_valid_drops_failed_positions() {
        let chunks = vec![chunk("a_0", "a", 1), chunk("a_1", "a", 1), chunk("a_2", "a", 1)];
        let embeddings = vec![Some(vec![1.0]), None, Some(vec![2.0])];
        let valid = pair_valid(&chunks, &embeddings).unwrap();
        assert_eq!(valid.len(), 2);
        assert_eq!(valid[0].0.metadata.chunk_id, "a_0");
        assert_eq!(valid[1].0.metadata.chunk_id, "a_2");
    }

    #[test]
    fn pair_valid_rejects_length_mismatch_and_empty() {
        let chunks = vec![chunk("a_0", "a", 1)];
        assert!(matches!(
            pair_valid(&chunks, &[]).unwrap_err(),
            RagError::Validation(_)
        ));
        assert!(matches!(
            pair_valid(&chunks, &[None]).unwrap_err(),
            RagError::Validation(_)
        ));
    }

    #[test]
    fn batch_arithmetic() {
        assert_eq!(batch_count(0, 500), 0);
        assert_eq!(batch_count(1, 500), 1);
        assert_eq!(batch_count(500, 500), 1);
        assert_eq!(batch_count(501, 500), 2);
        assert_eq!(batch_count(1700, 500), 4);
    }

    #[test]
    fn stable_point_ids_are_deterministic_and_distinct() {
        assert_eq!(stable_point_id("a_chunk_0"), stable_point_id("a_chunk_0"));
        assert_ne!(stable_point_id("a_chunk_0"), stable_point_id("a_chunk_1"));
    }

    #[test]
    fn document_key_selection_is_exact() {
        let all = vec![
            listed("a_0", "a.txt", 1),
            listed("b_0", "a.txt.bak", 1),
            listed("a_1", "a.txt", 2),
            listed("c_0", "c.pdf", 1),
        ];
        let keys = keys_matching_document(&all, "a.txt");
        assert_eq!(keys, vec!["a_0".to_string(), "a_1".to_string()]);
        assert!(keys_matching_document(&all, "missing.txt").is_empty());
    }

    #[test]
    fn grouping_counts_sorts_and_dedups_pages() {
        let all = vec![
            listed("b_0", "b.pdf", 2),
            listed("a_0", "a.txt", 1),
            listed("b_1", "b.pdf", 1),
            listed("b_2", "b.pdf", 2),
        ];
        let docs = group_documents(all);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].document, "a.txt");
        assert_eq!(docs[1].document, "b.pdf");
        assert_eq!(docs[1].chunk_count, 3);
        assert_eq!(docs[1].pages, vec![1, 2]);
        assert_eq!(docs[1].page_count, 2);
    }

    #[test]
    fn retrieved_mapping_inverts_score() {
        let payload = json!({
            "content": "hello",
            "document": "a.txt",
            "page": "3",
            "chunk_index": "7",
            "source_type": "txt",
            "chunk_id": "a.txt_chunk_7",
        });
        let hit = scored_to_retrieved(0.92, &payload);
        assert_eq!(hit.content, "hello");
        assert_eq!(hit.metadata.page, 3);
        assert_eq!(hit.metadata.chunk_index, 7);
        assert!((hit.similarity - 0.92).abs() < 1e-6);
        assert!((hit.distance - 0.08).abs() < 1e-6);
        assert!((hit.similarity - (1.0 - hit.distance)).abs() < 1e-6);
    }

    #[test]
    fn throttle_classification() {
        assert!(is_throttled("status: ResourceExhausted, message: busy"));
        assert!(is_throttled("HTTP 429 Too Many Requests"));
        assert!(!is_throttled("not found"));
    }
}
