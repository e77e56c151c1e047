//! Evidence retrieval against the active session

mod retriever;

pub use retriever::EvidenceRetriever;
