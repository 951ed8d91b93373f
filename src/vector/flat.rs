// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Exact nearest-neighbour search
//!
//! Scans every stored embedding, like a FAISS flat L2 index. For a corpus of a
//! few thousand passages this is fast enough and fully deterministic: equal
//! distances keep the order documents were stored in.

use super::{
    euclidean_distance, validate_documents, validate_query, IndexError, IndexedDocument,
    ScoredDocument, VectorIndex,
};

#[derive(Debug, Clone)]
pub struct FlatIndex {
    documents: Vec<IndexedDocument>,
    dimensions: usize,
}

impl FlatIndex {
    pub fn new(documents: Vec<IndexedDocument>, dimensions: usize) -> Result<Self, IndexError> {
        validate_documents(&documents, dimensions)?;
        Ok(Self {
            documents,
            dimensions,
        })
    }
}

impl VectorIndex for FlatIndex {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredDocument>, IndexError> {
        validate_query(query, self.dimensions)?;
        if k == 0 || self.documents.is_empty() {
            return Ok(vec![]);
        }

        let mut scored: Vec<(usize, f32)> = self
            .documents
            .iter()
            .enumerate()
            .map(|(position, doc)| (position, euclidean_distance(query, &doc.embedding)))
            .collect();

        // Stable sort: ties stay in storage order
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, distance)| {
                let doc = &self.documents[position];
                ScoredDocument {
                    id: doc.id.clone(),
                    document: doc.document.clone(),
                    distance,
                }
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.documents.len()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
