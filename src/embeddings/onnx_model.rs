// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX sentence-transformer embeddings
//!
//! Runs all-MiniLM-L6-v2 (or any BERT-style encoder exported to ONNX) on the
//! CPU execution provider. The exported graph returns token-level states, so
//! the sentence vector is the attention-masked mean over tokens, which is what
//! sentence-transformers computes when the index is built.

use super::{l2_normalize, EmbeddingProvider};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ndarray::{Array2, Axis};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

/// Maximum sequence length of all-MiniLM-L6-v2
const MAX_SEQUENCE_LENGTH: usize = 256;

/// ONNX-based embedding model
///
/// # Thread Safety
/// The session sits behind a `Mutex`: ONNX Runtime sessions need `&mut` to
/// run, and the chatbot shares one model across every request. Inference
/// runs on tokio's blocking pool so the async workers stay free.
#[derive(Clone)]
pub struct OnnxEmbeddingModel {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    model_name: String,
    dimension: usize,
    normalize: bool,
}

impl std::fmt::Debug for OnnxEmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingModel")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .field("normalize", &self.normalize)
            .finish_non_exhaustive()
    }
}

/// Token ids, attention mask and token type ids for a single text
struct EncodedInput {
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
    token_type_ids: Vec<i64>,
}

impl OnnxEmbeddingModel {
    /// Loads the model and tokenizer from disk and probes the output dimension
    ///
    /// # Errors
    /// Returns error if either file is missing or invalid, or if the graph
    /// does not produce `[batch, seq_len, hidden]` token states.
    pub async fn new<P: AsRef<Path>>(
        model_name: impl Into<String>,
        model_path: P,
        tokenizer_path: P,
        normalize: bool,
    ) -> Result<Self> {
        let model_name = model_name.into();
        let model_path = model_path.as_ref();
        let tokenizer_path = tokenizer_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        info!("🔄 Loading embedding model {} from {}", model_name, model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;

        let mut model = Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_name,
            dimension: 0,
            normalize,
        };

        let probe = model
            .run("validation test")
            .context("Embedding model validation run failed")?;
        model.dimension = probe.len();

        info!(
            "✅ Embedding model {} loaded ({} dimensions)",
            model.model_name, model.dimension
        );
        Ok(model)
    }

    fn encode(&self, text: &str) -> Result<EncodedInput> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let token_type_ids = vec![0i64; input_ids.len()];

        Ok(EncodedInput {
            input_ids,
            attention_mask,
            token_type_ids,
        })
    }

    /// Tokenize, run the graph and mean-pool; synchronous under the session lock
    fn run(&self, text: &str) -> Result<Vec<f32>> {
        let encoded = self.encode(text)?;
        let seq_len = encoded.input_ids.len();
        let pooling_mask = encoded.attention_mask.clone();

        let input_ids = Array2::from_shape_vec((1, seq_len), encoded.input_ids)
            .context("Failed to create input_ids array")?;
        let attention_mask = Array2::from_shape_vec((1, seq_len), encoded.attention_mask)
            .context("Failed to create attention_mask array")?;
        let token_type_ids = Array2::from_shape_vec((1, seq_len), encoded.token_type_ids)
            .context("Failed to create token_type_ids array")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("Embedding session lock poisoned"))?;
        let outputs = session.run(ort::inputs![
            "input_ids" => Value::from_array(input_ids)?,
            "attention_mask" => Value::from_array(attention_mask)?,
            "token_type_ids" => Value::from_array(token_type_ids)?
        ])?;

        // Output names differ between exports; the token states come first
        let states = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;
        if states.ndim() != 3 {
            anyhow::bail!(
                "Model outputs unexpected dimensions: {:?} (expected [batch, seq_len, hidden])",
                states.shape()
            );
        }

        let tokens = states.index_axis(Axis(0), 0);
        let hidden_dim = tokens.shape()[1];
        let mut pooled = vec![0.0f32; hidden_dim];
        let mut mask_total = 0.0f32;

        for (i, token) in tokens.outer_iter().enumerate() {
            let weight = pooling_mask.get(i).copied().unwrap_or(0) as f32;
            mask_total += weight;
            for (acc, value) in pooled.iter_mut().zip(token.iter()) {
                *acc += value * weight;
            }
        }
        for value in &mut pooled {
            *value /= mask_total.max(1e-9);
        }

        if self.normalize {
            l2_normalize(&mut pooled);
        }
        Ok(pooled)
    }
}

#[async_trait]
impl EmbeddingProvider for OnnxEmbeddingModel {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let model = self.clone();
        let owned = text.to_string();
        let embedding = tokio::task::spawn_blocking(move || model.run(&owned))
            .await
            .context("Embedding task failed")??;
        if embedding.len() != self.dimension {
            anyhow::bail!(
                "Unexpected embedding dimension: {} (expected {})",
                embedding.len(),
                self.dimension
            );
        }
        debug!("Embedded {} chars with {}", text.len(), self.model_name);
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
