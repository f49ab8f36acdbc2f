use std::path::Path;

use crate::error::Result;
use crate::types::DocumentChunk;

/// Turns a source file into plain text. Pages are separated by form feeds (`\f`).
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String>;
}

/// Ranked lexical retrieval over an in-memory chunk collection.
pub trait Retriever: Send + Sync {
    /// Appends chunks, returning the number stored.
    fn index(&self, chunks: Vec<DocumentChunk>) -> usize;
    /// Returns at most `k` chunks with a positive score, best first.
    fn search(&self, query: &str, k: usize) -> Vec<DocumentChunk>;
    fn clear(&self);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
