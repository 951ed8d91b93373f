// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vector index over the CAN 2025 corpus
//!
//! The index is built offline and persisted as a directory (see [`storage`]).
//! At query time it is read-only: the pipeline only ever calls
//! [`VectorIndex::search`].

pub mod flat;
pub mod hnsw;
pub mod storage;

pub use flat::FlatIndex;
pub use hnsw::HnswIndex;
pub use storage::{load_index, IndexFile, StoredDocument, INDEX_FILE_NAME};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A passage of the corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A document together with its stored embedding
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedDocument {
    pub id: String,
    pub document: Document,
    pub embedding: Vec<f32>,
}

/// A search hit; smaller distance means more similar
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub id: String,
    pub document: Document,
    /// Euclidean distance between the query and the stored embedding
    pub distance: f32,
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Index file not found: {0}")]
    NotFound(String),

    #[error("Failed to read index {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse index {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("Index dimensions must be greater than 0")]
    ZeroDimensions,

    #[error("Document {id} has wrong dimensions: expected {expected}, got {actual}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },

    #[error("Document {0} contains NaN or Infinity values")]
    NonFiniteEmbedding(String),

    #[error("Duplicate document id: {0}")]
    DuplicateId(String),

    #[error("Query has wrong dimensions: expected {expected}, got {actual}")]
    QueryDimensionMismatch { expected: usize, actual: usize },

    #[error("Query contains NaN or Infinity values")]
    NonFiniteQuery,

    #[error(
        "Embedding model produces {model}-dimensional vectors but the index stores {index}-dimensional vectors"
    )]
    EmbeddingDimensionMismatch { model: usize, index: usize },

    #[error("Failed to serialize index: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Nearest-neighbour lookup over stored document embeddings
pub trait VectorIndex: Send + Sync {
    /// Returns at most `k` documents ordered by ascending distance to `query`
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredDocument>, IndexError>;

    /// Number of stored documents
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension of stored embeddings
    fn dimensions(&self) -> usize;
}

/// Shared checks for documents entering an index
pub(crate) fn validate_documents(
    documents: &[IndexedDocument],
    dimensions: usize,
) -> Result<(), IndexError> {
    if dimensions == 0 {
        return Err(IndexError::ZeroDimensions);
    }

    let mut seen = std::collections::HashSet::with_capacity(documents.len());
    for doc in documents {
        if doc.embedding.len() != dimensions {
            return Err(IndexError::DimensionMismatch {
                id: doc.id.clone(),
                expected: dimensions,
                actual: doc.embedding.len(),
            });
        }
        if doc.embedding.iter().any(|v| !v.is_finite()) {
            return Err(IndexError::NonFiniteEmbedding(doc.id.clone()));
        }
        if !seen.insert(doc.id.as_str()) {
            return Err(IndexError::DuplicateId(doc.id.clone()));
        }
    }
    Ok(())
}

/// Shared checks for query vectors
pub(crate) fn validate_query(query: &[f32], dimensions: usize) -> Result<(), IndexError> {
    if query.len() != dimensions {
        return Err(IndexError::QueryDimensionMismatch {
            expected: dimensions,
            actual: query.len(),
        });
    }
    if query.iter().any(|v| !v.is_finite()) {
        return Err(IndexError::NonFiniteQuery);
    }
    Ok(())
}

/// Euclidean distance between two vectors of equal length
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
