// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Retrieval and prompt assembly over an in-memory index

use can_chatbot::{
    embeddings::{EmbeddingProvider, HashEmbeddingModel},
    rag::{PromptAssembler, RagError, Retriever, DEFAULT_TOP_K},
    vector::{Document, FlatIndex, IndexError, IndexedDocument, VectorIndex},
};
use std::sync::Arc;

const DIMENSIONS: usize = 16;

fn corpus(model: &HashEmbeddingModel, count: usize) -> Vec<IndexedDocument> {
    (0..count)
        .map(|i| {
            let text = format!("Match {} de la phase de groupes", i);
            IndexedDocument {
                id: i.to_string(),
                embedding: model.generate(&text),
                document: Document::new(text),
            }
        })
        .collect()
}

fn retriever(count: usize, top_k: usize) -> Retriever {
    let model = HashEmbeddingModel::new(DIMENSIONS, false).unwrap();
    let index: Arc<dyn VectorIndex> =
        Arc::new(FlatIndex::new(corpus(&model, count), DIMENSIONS).unwrap());
    Retriever::new(Arc::new(model), index, top_k).unwrap()
}

#[tokio::test]
async fn test_retrieves_at_most_k() {
    let retriever = retriever(25, DEFAULT_TOP_K);
    let documents = retriever.retrieve("Qui a gagné ?").await.unwrap();
    assert_eq!(documents.len(), 10);
    for pair in documents.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }
}

#[tokio::test]
async fn test_small_index_returns_everything() {
    let retriever = retriever(3, DEFAULT_TOP_K);
    assert_eq!(retriever.retrieve("finale").await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_exact_text_is_nearest() {
    let retriever = retriever(25, 5);
    let documents = retriever
        .retrieve("Match 17 de la phase de groupes")
        .await
        .unwrap();
    assert_eq!(documents[0].id, "17");
    assert!(documents[0].distance < 1e-5);
}

#[tokio::test]
async fn test_empty_index_yields_no_context() {
    let retriever = retriever(0, DEFAULT_TOP_K);
    let documents = retriever.retrieve("Qui a gagné ?").await.unwrap();
    assert!(documents.is_empty());

    let prompt = PromptAssembler::default().build("Qui a gagné ?", &documents);
    assert_eq!(prompt.documents_used, 0);
    assert!(prompt.render().contains("Contexte:\n\n\nQuestion: Qui a gagné ?"));
}

#[test]
fn test_dimension_mismatch_refused() {
    let model = HashEmbeddingModel::new(8, false).unwrap();
    let index: Arc<dyn VectorIndex> = Arc::new(FlatIndex::new(vec![], DIMENSIONS).unwrap());
    let err = Retriever::new(Arc::new(model), index, 10).unwrap_err();
    assert!(matches!(
        err,
        IndexError::EmbeddingDimensionMismatch {
            model: 8,
            index: DIMENSIONS
        }
    ));
}

struct FailingEmbedder;

#[async_trait::async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        anyhow::bail!("tokenizer unavailable")
    }

    fn dimension(&self) -> usize {
        DIMENSIONS
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

#[tokio::test]
async fn test_embedding_failure_is_reported_by_stage() {
    let index: Arc<dyn VectorIndex> = Arc::new(FlatIndex::new(vec![], DIMENSIONS).unwrap());
    let retriever = Retriever::new(Arc::new(FailingEmbedder), index, 10).unwrap();

    let err = retriever.retrieve("Qui a gagné ?").await.unwrap_err();
    assert!(matches!(err, RagError::Embedding(_)));
    assert_eq!(err.stage(), "embedding");
    assert!(err.to_string().contains("tokenizer unavailable"));
}

#[tokio::test]
async fn test_budget_drops_lowest_ranked() {
    let retriever = retriever(25, DEFAULT_TOP_K);
    let documents = retriever.retrieve("Match 3 de la phase de groupes").await.unwrap();

    let first = documents[0].document.content.chars().count();
    let assembler = PromptAssembler::new(first + 10);
    let prompt = assembler.build("Qui ?", &documents);

    assert_eq!(prompt.documents_used, 1);
    assert!(prompt.truncated);
    assert_eq!(prompt.context, documents[0].document.content);
}
