// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Embedding providers
//!
//! Turns question text into the vector space of the persisted index.
//! [`OnnxEmbeddingModel`] runs all-MiniLM-L6-v2 locally; [`HashEmbeddingModel`]
//! is a deterministic stand-in for tests and offline smoke runs.

pub mod onnx_model;

pub use onnx_model::OnnxEmbeddingModel;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Maps text to a fixed-length vector
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Output dimension of every vector returned by [`embed`](Self::embed)
    fn dimension(&self) -> usize;

    /// Model name for logging
    fn model_name(&self) -> &str;
}

/// Deterministic pseudo-random embeddings derived from a hash of the text
///
/// Identical texts always map to identical vectors, so a document indexed
/// with this model is its own nearest neighbour.
#[derive(Debug, Clone)]
pub struct HashEmbeddingModel {
    dimension: usize,
    normalize: bool,
}

impl HashEmbeddingModel {
    pub fn new(dimension: usize, normalize: bool) -> Result<Self> {
        if dimension == 0 {
            return Err(anyhow!("Embedding dimension must be greater than 0"));
        }
        Ok(Self {
            dimension,
            normalize,
        })
    }

    pub fn generate(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut current_seed = hasher.finish();

        let mut embedding = Vec::with_capacity(self.dimension);
        for i in 0..self.dimension {
            // Linear congruential step, mixed with the position
            current_seed =
                (current_seed.wrapping_mul(1664525).wrapping_add(1013904223)) ^ (i as u64);
            let value = (current_seed as f64 / u64::MAX as f64) * 2.0 - 1.0;
            embedding.push(value as f32);
        }

        if self.normalize {
            l2_normalize(&mut embedding);
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingModel {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.generate(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hash-embedding"
    }
}

/// Scales a vector to unit length; zero vectors are left untouched
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 && norm.is_finite() {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}
