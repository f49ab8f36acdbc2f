use tacit_core::types::DocumentChunk;

/// Append-only, insertion-ordered chunk collection.
///
/// Positions are stable until the next [`ChunkStore::clear`]; there is no
/// per-chunk removal.
#[derive(Debug, Default, Clone)]
pub struct ChunkStore {
    chunks: Vec<DocumentChunk>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends all chunks at once and returns how many were added.
    pub fn ingest(&mut self, chunks: Vec<DocumentChunk>) -> usize {
        let added = chunks.len();
        self.chunks.extend(chunks);
        added
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    pub fn chunks(&self) -> &[DocumentChunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
