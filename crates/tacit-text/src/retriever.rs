use parking_lot::RwLock;
use tacit_core::traits::Retriever;
use tacit_core::types::DocumentChunk;
use tracing::info;

use crate::ranker::rank;
use crate::store::ChunkStore;

/// In-memory TF‑IDF retriever: a [`ChunkStore`] behind a lock.
///
/// Appends happen under a single write lock, so a query never sees a
/// half-ingested batch.
#[derive(Debug, Default)]
pub struct TfIdfRetriever {
    store: RwLock<ChunkStore>,
}

impl TfIdfRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_store(store: ChunkStore) -> Self {
        Self { store: RwLock::new(store) }
    }
}

impl Retriever for TfIdfRetriever {
    fn index(&self, chunks: Vec<DocumentChunk>) -> usize {
        let mut store = self.store.write();
        let added = store.ingest(chunks);
        info!(added, total = store.len(), "indexed chunks");
        added
    }

    fn search(&self, query: &str, k: usize) -> Vec<DocumentChunk> {
        let store = self.store.read();
        let chunks = store.chunks();
        rank(query, chunks, k)
            .into_iter()
            .map(|hit| chunks[hit.index].clone())
            .collect()
    }

    fn clear(&self) {
        let mut store = self.store.write();
        let removed = store.len();
        store.clear();
        info!(removed, "cleared chunk store");
    }

    fn len(&self) -> usize {
        self.store.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_returns_chunks_in_rank_order() {
        let retriever = TfIdfRetriever::new();
        retriever.index(vec![
            DocumentChunk::new("apple banana apple", 1, "A"),
            DocumentChunk::new("banana cherry", 2, "B"),
            DocumentChunk::new("apple cherry cherry", 3, "C"),
        ]);
        let hits = retriever.search("apple", 2);
        let sources: Vec<&str> = hits.iter().map(|c| c.metadata.source_id.as_str()).collect();
        assert_eq!(sources, vec!["A", "C"]);
        assert_eq!(hits[1].metadata.page, 3);
    }

    #[test]
    fn clear_empties_and_is_repeatable() {
        let retriever = TfIdfRetriever::from_store(ChunkStore::new());
        retriever.index(vec![DocumentChunk::new("apple pie recipe", 1, "A")]);
        assert_eq!(retriever.len(), 1);
        retriever.clear();
        retriever.clear();
        assert!(retriever.is_empty());
        assert!(retriever.search("apple", 3).is_empty());
    }
}
