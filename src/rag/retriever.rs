// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Question → nearest documents

use super::RagError;
use crate::embeddings::EmbeddingProvider;
use crate::vector::{IndexError, ScoredDocument, VectorIndex};
use std::sync::Arc;
use tracing::debug;

/// Number of passages the deployed chatbot retrieves per question
pub const DEFAULT_TOP_K: usize = 10;

/// Embeds a question and looks up its `top_k` nearest documents
///
/// No similarity threshold and no deduplication: whatever the index returns
/// is handed to the prompt assembler in index order.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("embedder", &self.embedder.model_name())
            .field("documents", &self.index.len())
            .field("top_k", &self.top_k)
            .finish()
    }
}

impl Retriever {
    /// Fails if the embedding model and the index disagree on dimensions
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        top_k: usize,
    ) -> Result<Self, IndexError> {
        if embedder.dimension() != index.dimensions() {
            return Err(IndexError::EmbeddingDimensionMismatch {
                model: embedder.dimension(),
                index: index.dimensions(),
            });
        }
        Ok(Self {
            embedder,
            index,
            top_k,
        })
    }

    pub async fn retrieve(&self, question: &str) -> Result<Vec<ScoredDocument>, RagError> {
        let query = self.embedder.embed(question).await?;
        let documents = self.index.search(&query, self.top_k)?;
        debug!(
            "Retrieved {} of {} requested documents (index holds {})",
            documents.len(),
            self.top_k,
            self.index.len()
        );
        Ok(documents)
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn index_len(&self) -> usize {
        self.index.len()
    }
}
