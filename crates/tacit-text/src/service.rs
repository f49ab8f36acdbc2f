use std::path::Path;
use std::sync::Arc;

use tacit_core::config::Settings;
use tacit_core::data_processor::{source_id_for, DataProcessor};
use tacit_core::error::{Error, Result};
use tacit_core::traits::Retriever;
use tacit_core::types::{ClearResponse, DocumentChunk, IngestResponse, QueryResponse};
use tracing::{info, warn};

use crate::retriever::TfIdfRetriever;

/// Ingestion, query and clear boundaries over a shared retriever.
///
/// Every operation reports failures inside its response payload; nothing here
/// returns `Err` or panics on bad input.
pub struct RagService {
    retriever: Arc<dyn Retriever>,
    processor: DataProcessor,
    default_k: usize,
}

impl RagService {
    pub fn new(retriever: Arc<dyn Retriever>, processor: DataProcessor, default_k: usize) -> Self {
        Self { retriever, processor, default_k: default_k.max(1) }
    }

    /// TF‑IDF retriever with chunking and `k` taken from settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(TfIdfRetriever::new()),
            DataProcessor::new(settings.chunking.clone()),
            settings.retrieval.default_k,
        )
    }

    /// Shared handle to the underlying retriever.
    pub fn retriever(&self) -> Arc<dyn Retriever> {
        Arc::clone(&self.retriever)
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }

    /// Chunks already extracted text and appends it under `source_id`.
    pub fn ingest_text(&self, text: &str, source_id: &str) -> IngestResponse {
        let chunks = self.processor.chunk_text(text, source_id);
        self.commit(source_id, chunks)
    }

    /// Ingests one file; the reported source id matches its chunks' file name.
    pub fn ingest_file(&self, path: &Path) -> IngestResponse {
        let source_id = match source_id_for(path) {
            Ok(source_id) => source_id,
            Err(e) => return IngestResponse::failed(e),
        };
        self.ingest_with(&source_id, || self.processor.process_file(path))
    }

    /// Ingests every `.txt` file under `dir` as one batch: all or nothing.
    pub fn ingest_directory(&self, dir: &Path) -> IngestResponse {
        let source_id = dir.display().to_string();
        self.ingest_with(&source_id, || self.processor.process_directory(dir))
    }

    /// Ranks stored chunks against `query`; `k` defaults to the configured value.
    pub fn query(&self, query: &str, k: Option<i64>) -> QueryResponse {
        let k = match validate_k(k, self.default_k) {
            Ok(k) => k,
            Err(e) => return QueryResponse::failed(e),
        };
        if self.retriever.is_empty() {
            return QueryResponse::empty("No documents indexed");
        }
        QueryResponse::found(self.retriever.search(query, k))
    }

    pub fn clear(&self) -> ClearResponse {
        self.retriever.clear();
        ClearResponse { success: true, message: "All documents cleared".to_string() }
    }

    fn ingest_with<F>(&self, source_id: &str, produce: F) -> IngestResponse
    where
        F: FnOnce() -> Result<Vec<DocumentChunk>>,
    {
        match produce() {
            Ok(chunks) => self.commit(source_id, chunks),
            Err(e) => {
                warn!(source = source_id, error = %e, "ingestion failed; store left unchanged");
                IngestResponse::failed(e)
            }
        }
    }

    fn commit(&self, source_id: &str, chunks: Vec<DocumentChunk>) -> IngestResponse {
        let added = self.retriever.index(chunks);
        info!(source = source_id, added, "ingested document");
        IngestResponse::processed(source_id, added)
    }
}

fn validate_k(k: Option<i64>, default_k: usize) -> Result<usize> {
    match k {
        None => Ok(default_k),
        Some(k) if k >= 1 => usize::try_from(k)
            .map_err(|_| Error::InvalidInput(format!("k is too large: {k}"))),
        Some(k) => Err(Error::InvalidInput(format!("k must be a positive integer, got {k}"))),
    }
}
