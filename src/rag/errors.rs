// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the question-answering pipeline
//!
//! Each variant names the stage that failed, so the HTTP layer can tell a
//! provider outage apart from a real answer.

use crate::generation::GenerationError;
use crate::vector::IndexError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    /// The embedding model could not embed the question
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// The vector index rejected the query
    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] IndexError),

    /// The LLM call failed
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),
}

impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::Embedding(err.to_string())
    }
}

impl RagError {
    /// Short label for logs and error envelopes
    pub fn stage(&self) -> &'static str {
        match self {
            RagError::Embedding(_) => "embedding",
            RagError::Retrieval(_) => "retrieval",
            RagError::Generation(_) => "generation",
        }
    }
}
