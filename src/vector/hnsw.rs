// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HNSW Index for approximate vector search
//!
//! Hierarchical Navigable Small World graph over the stored embeddings, using
//! Euclidean distance so results rank the same way as [`super::FlatIndex`].
//! Worth it once the corpus reaches tens of thousands of passages; below
//! that the flat index is both exact and fast enough.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use can_chatbot::vector::{HnswIndex, VectorIndex};
//!
//! let index = HnswIndex::build(documents, 384)?;
//! let results = index.search(&query, 10)?;
//! ```

use super::{
    validate_documents, validate_query, Document, IndexError, IndexedDocument, ScoredDocument,
    VectorIndex,
};
use hnsw_rs::hnsw::{Hnsw, Neighbour};
use hnsw_rs::prelude::*;
use std::sync::Arc;

/// Connections per node (M parameter)
const MAX_NB_CONNECTION: usize = 16;
/// Candidate list size during construction
const EF_CONSTRUCTION: usize = 200;

pub struct HnswIndex {
    hnsw: Arc<Hnsw<'static, f32, DistL2>>,
    /// Position in this vector is the HNSW data id
    entries: Arc<Vec<(String, Document)>>,
    dimensions: usize,
}

impl std::fmt::Debug for HnswIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HnswIndex")
            .field("documents", &self.entries.len())
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

impl HnswIndex {
    /// Build the graph from indexed documents
    ///
    /// # Errors
    ///
    /// Returns error if any embedding has the wrong dimensions, contains
    /// NaN/Infinity, or if two documents share an id.
    pub fn build(documents: Vec<IndexedDocument>, dimensions: usize) -> Result<Self, IndexError> {
        validate_documents(&documents, dimensions)?;

        // log2(n) layers, clamped to what hnsw_rs supports
        let nb_layer = if documents.len() > 1 {
            ((documents.len() as f32).log2().ceil() as usize).clamp(4, 16)
        } else {
            4
        };

        let mut hnsw: Hnsw<f32, DistL2> = Hnsw::new(
            MAX_NB_CONNECTION,
            documents.len().max(1),
            nb_layer,
            EF_CONSTRUCTION,
            DistL2,
        );

        let mut entries = Vec::with_capacity(documents.len());
        for (data_id, doc) in documents.into_iter().enumerate() {
            hnsw.insert((doc.embedding.as_slice(), data_id));
            entries.push((doc.id, doc.document));
        }
        hnsw.set_searching_mode(true);

        Ok(Self {
            hnsw: Arc::new(hnsw),
            entries: Arc::new(entries),
            dimensions,
        })
    }
}

impl VectorIndex for HnswIndex {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredDocument>, IndexError> {
        validate_query(query, self.dimensions)?;
        if k == 0 || self.entries.is_empty() {
            return Ok(vec![]);
        }

        // ef_search should comfortably exceed k
        let ef_search = (k * 2).max(50);
        let neighbours: Vec<Neighbour> = self.hnsw.search(query, k, ef_search);

        let mut results: Vec<ScoredDocument> = neighbours
            .into_iter()
            .filter_map(|neighbour| {
                self.entries
                    .get(neighbour.d_id)
                    .map(|(id, document)| ScoredDocument {
                        id: id.clone(),
                        document: document.clone(),
                        distance: neighbour.distance,
                    })
            })
            .collect();

        results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        results.truncate(k);
        Ok(results)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
