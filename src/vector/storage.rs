// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! On-disk layout of the persisted index
//!
//! An index is a directory holding a single `index.json`:
//!
//! ```json
//! {
//!   "dimensions": 384,
//!   "model": "all-MiniLM-L6-v2",
//!   "documents": [
//!     { "id": "0", "content": "...", "metadata": { "source": "..." }, "embedding": [0.01, ...] }
//!   ]
//! }
//! ```
//!
//! Documents keep their file order, which is the tie-break order at search time.

use super::{Document, FlatIndex, HnswIndex, IndexError, IndexedDocument, VectorIndex};
use crate::config::IndexKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub const INDEX_FILE_NAME: &str = "index.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexFile {
    pub dimensions: usize,
    /// Embedding model the vectors were produced with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub documents: Vec<StoredDocument>,
}

impl IndexFile {
    pub fn read(dir: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = dir.as_ref().join(INDEX_FILE_NAME);
        if !path.exists() {
            return Err(IndexError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(&path).map_err(|source| IndexError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| IndexError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Writes `index.json` into `dir`, creating the directory if needed
    pub fn write(&self, dir: impl AsRef<Path>) -> Result<(), IndexError> {
        let dir = dir.as_ref();
        let path = dir.join(INDEX_FILE_NAME);
        let io_err = |source: std::io::Error| IndexError::Io {
            path: path.display().to_string(),
            source,
        };
        std::fs::create_dir_all(dir).map_err(io_err)?;
        let content = serde_json::to_string(self)?;
        std::fs::write(&path, content).map_err(io_err)
    }

    pub fn from_documents(
        dimensions: usize,
        model: Option<String>,
        documents: Vec<IndexedDocument>,
    ) -> Self {
        Self {
            dimensions,
            model,
            documents: documents
                .into_iter()
                .map(|doc| StoredDocument {
                    id: doc.id,
                    content: doc.document.content,
                    metadata: doc.document.metadata,
                    embedding: doc.embedding,
                })
                .collect(),
        }
    }

    pub fn into_documents(self) -> Vec<IndexedDocument> {
        self.documents
            .into_iter()
            .map(|stored| IndexedDocument {
                id: stored.id,
                document: Document {
                    content: stored.content,
                    metadata: stored.metadata,
                },
                embedding: stored.embedding,
            })
            .collect()
    }
}

/// Loads the persisted index from `dir` into the requested search structure
pub fn load_index(dir: impl AsRef<Path>, kind: IndexKind) -> Result<Arc<dyn VectorIndex>, IndexError> {
    let dir = dir.as_ref();
    let file = IndexFile::read(dir)?;
    let dimensions = file.dimensions;
    let model = file.model.clone().unwrap_or_else(|| "unknown".to_string());
    let documents = file.into_documents();
    let count = documents.len();

    let index: Arc<dyn VectorIndex> = match kind {
        IndexKind::Flat => Arc::new(FlatIndex::new(documents, dimensions)?),
        IndexKind::Hnsw => Arc::new(HnswIndex::build(documents, dimensions)?),
    };

    info!(
        "📚 Loaded {:?} index from {}: {} documents, {} dimensions (model: {})",
        kind,
        dir.display(),
        count,
        dimensions,
        model
    );
    Ok(index)
}
