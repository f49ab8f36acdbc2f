//! tacit-text
//!
//! Lexical retrieval over an in-memory chunk store: tokenizer, TF‑IDF ranker,
//! a lock-guarded retriever, and the ingestion/query/clear boundary used by the
//! agent and the CLI.
pub mod ranker;
pub mod retriever;
pub mod service;
pub mod store;
pub mod tokenizer;

pub use ranker::{rank, score_chunks, ScoredChunk};
pub use retriever::TfIdfRetriever;
pub use service::RagService;
pub use store::ChunkStore;
pub use tokenizer::tokenize;
