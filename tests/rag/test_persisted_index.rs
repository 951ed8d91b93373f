// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Loading index.json from disk into both index kinds

use can_chatbot::{
    config::IndexKind,
    embeddings::HashEmbeddingModel,
    rag::Retriever,
    vector::{load_index, Document, IndexError, IndexFile, IndexedDocument, INDEX_FILE_NAME},
};
use std::sync::Arc;
use tempfile::TempDir;

const DIMENSIONS: usize = 24;

fn write_corpus(dir: &std::path::Path, count: usize) -> HashEmbeddingModel {
    let model = HashEmbeddingModel::new(DIMENSIONS, true).unwrap();
    let documents = (0..count)
        .map(|i| {
            let text = format!("Fiche joueur numéro {}", i);
            IndexedDocument {
                id: format!("player-{}", i),
                embedding: model.generate(&text),
                document: Document::new(text).with_metadata("line", i as u64),
            }
        })
        .collect();
    IndexFile::from_documents(DIMENSIONS, Some("hash-embedding".to_string()), documents)
        .write(dir)
        .unwrap();
    model
}

#[tokio::test]
async fn test_flat_and_hnsw_agree_on_nearest() {
    let dir = TempDir::new().unwrap();
    let model = write_corpus(dir.path(), 200);

    for kind in [IndexKind::Flat, IndexKind::Hnsw] {
        let index = load_index(dir.path(), kind).unwrap();
        assert_eq!(index.len(), 200);

        let retriever = Retriever::new(Arc::new(model.clone()), index, 10).unwrap();
        let documents = retriever.retrieve("Fiche joueur numéro 42").await.unwrap();

        assert_eq!(documents.len(), 10, "{:?}", kind);
        assert_eq!(documents[0].id, "player-42", "{:?}", kind);
        assert_eq!(documents[0].document.metadata["line"], 42);
    }
}

#[test]
fn test_index_file_is_plain_json() {
    let dir = TempDir::new().unwrap();
    write_corpus(dir.path(), 2);

    let raw = std::fs::read_to_string(dir.path().join(INDEX_FILE_NAME)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["dimensions"], DIMENSIONS);
    assert_eq!(value["model"], "hash-embedding");
    assert_eq!(value["documents"][1]["id"], "player-1");
    assert_eq!(
        value["documents"][0]["embedding"].as_array().unwrap().len(),
        DIMENSIONS
    );
}

#[test]
fn test_missing_index_fails_at_startup() {
    let dir = TempDir::new().unwrap();
    let result = load_index(dir.path().join("faiss_index_can"), IndexKind::Flat);
    assert!(matches!(result, Err(IndexError::NotFound(_))));
}

#[test]
fn test_duplicate_ids_rejected() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(INDEX_FILE_NAME),
        r#"{"dimensions": 2, "documents": [{"id": "a", "content": "x", "embedding": [1.0, 2.0]},
            {"id": "a", "content": "y", "embedding": [3.0, 4.0]}]}"#,
    )
    .unwrap();
    match load_index(dir.path(), IndexKind::Flat) {
        Err(IndexError::DuplicateId(id)) => assert_eq!(id, "a"),
        Err(other) => panic!("expected DuplicateId, got {}", other),
        Ok(_) => panic!("index with duplicate ids was accepted"),
    }
}
