// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the CAN 2025 chatbot API

/// Semantic version number, reported by `GET /`
pub const VERSION_NUMBER: &str = "1.0.0";

/// Full version string with feature description
pub const VERSION: &str = "v1.0.0-can2025-rag";

/// Build date
pub const BUILD_DATE: &str = "2025-12-18";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "rag",
    "onnx-embeddings",
    "flat-index",
    "hnsw-index",
    "gemini-generation",
    "context-budget",
    "explicit-provider-errors",
];

/// Returns the version string with the build date
pub fn get_version_string() -> String {
    format!("CAN Chatbot {} ({})", VERSION, BUILD_DATE)
}
