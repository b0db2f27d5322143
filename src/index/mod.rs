//! Vector index interface.

pub mod pinecone;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::review::IndexRecord;

pub use pinecone::PineconeIndex;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("index request failed")]
    Transport(#[from] reqwest::Error),
    #[error("index service rejected request ({status}): {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("invalid index host")]
    InvalidHost(#[from] url::ParseError),
}

/// A nearest-neighbour hit returned by [`VectorIndex::query`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    pub id: String,
    pub score: f32,
    pub metadata: IndexMap<String, String>,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Write the whole batch in one call; returns the number of records the
    /// index acknowledged. An empty batch is a no-op.
    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize, IndexError>;

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, IndexError>;
}
