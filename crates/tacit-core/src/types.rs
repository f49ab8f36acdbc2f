//! Domain types shared by the retrieval engine, the agent and the CLI.

use serde::{Deserialize, Serialize};

/// Provenance of a chunk: the originating document and its 1-based page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    pub page: u32,
    pub source_id: String,
}

/// A unit of indexed text.
///
/// - `content`: trimmed, non-empty text payload
/// - `metadata`: source document and page the text came from
///
/// Chunks are owned by the chunk store and never mutated once ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    pub fn new(content: impl Into<String>, page: u32, source_id: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: ChunkMetadata { page, source_id: source_id.into() },
        }
    }
}

/// Response of the query boundary.
///
/// `success == true` with empty `results` is the normal answer for an empty
/// store or a query with no lexical overlap. `error` is only set on failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub success: bool,
    pub results: Vec<DocumentChunk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResponse {
    pub fn found(results: Vec<DocumentChunk>) -> Self {
        Self { success: true, results, ..Self::default() }
    }

    pub fn empty(message: impl Into<String>) -> Self {
        Self { success: true, message: Some(message.into()), ..Self::default() }
    }

    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self { success: false, error: Some(error.to_string()), ..Self::default() }
    }
}

/// Response of the ingestion boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_processed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestResponse {
    pub fn processed(source_id: &str, chunks_processed: usize) -> Self {
        Self {
            success: true,
            message: Some(format!("Successfully processed {source_id}")),
            chunks_processed: Some(chunks_processed),
            source_id: Some(source_id.to_string()),
            error: None,
        }
    }

    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self { success: false, error: Some(error.to_string()), ..Self::default() }
    }
}

/// Response of the clear boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearResponse {
    pub success: bool,
    pub message: String,
}
