// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Chatbot facade
//!
//! Owns the retriever, the prompt assembler and the generation provider, all
//! constructed once at startup and shared read-only by every request.

use super::{PromptAssembler, RagError, Retriever};
use crate::config::ChatbotConfig;
use crate::embeddings::{EmbeddingProvider, OnnxEmbeddingModel};
use crate::generation::{GeminiClient, GenerationProvider};
use crate::vector::load_index;
use anyhow::Context;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Prefix of the answer text returned when the pipeline fails in apologize mode
pub const APOLOGY_PREFIX: &str = "Désolé, une erreur est survenue: ";

/// A generated answer
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    /// Passages that were placed in the prompt
    pub sources: usize,
}

pub struct Chatbot {
    retriever: Retriever,
    assembler: PromptAssembler,
    generator: Arc<dyn GenerationProvider>,
    temperature: f32,
}

impl std::fmt::Debug for Chatbot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chatbot")
            .field("retriever", &self.retriever)
            .field("assembler", &self.assembler)
            .field("generator", &self.generator.model_name())
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Chatbot {
    pub fn new(
        retriever: Retriever,
        assembler: PromptAssembler,
        generator: Arc<dyn GenerationProvider>,
        temperature: f32,
    ) -> Self {
        Self {
            retriever,
            assembler,
            generator,
            temperature,
        }
    }

    /// Loads the embedding model, the persisted index and the Gemini client
    ///
    /// Expects a configuration that already passed [`ChatbotConfig::validate`].
    pub async fn load(config: &ChatbotConfig) -> anyhow::Result<Self> {
        info!("🔄 Chargement du modèle d'embeddings...");
        let embedder = OnnxEmbeddingModel::new(
            config.embedding.model_name.clone(),
            &config.embedding.model_path,
            &config.embedding.tokenizer_path,
            config.embedding.normalize,
        )
        .await?;

        info!("🔄 Chargement de la base vectorielle...");
        let index = load_index(&config.index.path, config.index.kind)?;

        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(embedder);
        let retriever = Retriever::new(embedder, index, config.retrieval.top_k)?;
        info!(
            "Retriever ready: top {} of {} documents per question",
            retriever.top_k(),
            retriever.index_len()
        );

        info!("🔄 Initialisation du modèle {}...", config.generation.model);
        let generator = GeminiClient::from_config(&config.generation)
            .context("Failed to build Gemini client")?;

        info!("✅ Chatbot RAG initialisé avec succès !");
        Ok(Self::new(
            retriever,
            PromptAssembler::new(config.retrieval.max_context_chars),
            Arc::new(generator),
            config.generation.temperature,
        ))
    }

    /// Answers a question from the indexed corpus
    ///
    /// The question is used as given; callers validate it.
    pub async fn answer(&self, question: &str) -> Result<Answer, RagError> {
        let started = Instant::now();

        let documents = self.retriever.retrieve(question).await?;
        let prompt = self.assembler.build(question, &documents);
        if prompt.truncated {
            info!(
                "Context budget of {} chars reached: kept {} of {} passages",
                self.assembler.max_context_chars(),
                prompt.documents_used,
                documents.len()
            );
        }

        let text = self
            .generator
            .generate(&prompt.render(), self.temperature)
            .await?;

        info!(
            "Answered in {}ms from {} passages",
            started.elapsed().as_millis(),
            prompt.documents_used
        );
        Ok(Answer {
            text,
            sources: prompt.documents_used,
        })
    }

    /// Like [`answer`](Self::answer), but folds any failure into the answer text
    pub async fn answer_or_apology(&self, question: &str) -> String {
        match self.answer(question).await {
            Ok(answer) => answer.text,
            Err(e) => {
                error!("❌ Erreur lors de la génération de la réponse: {}", e);
                format!("{}{}", APOLOGY_PREFIX, e)
            }
        }
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }
}
