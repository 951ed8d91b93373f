// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration
//!
//! Defaults match the production deployment (port 5555, `faiss_index_can`,
//! all-MiniLM-L6-v2, gemini-2.5-flash-lite at temperature 0.1, k = 10).
//! A TOML file can override them, and the CLI/environment layer in
//! [`crate::cli`] overrides the file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variables searched for the Gemini API key, in order
pub const API_KEY_ENV_VARS: [&str; 2] = ["GOOGLE_API_KEY", "api-key"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No Gemini API key configured: set GOOGLE_API_KEY (or api-key) or pass --api-key")]
    MissingApiKey,

    #[error("top_k must be greater than 0")]
    InvalidTopK,

    #[error("temperature must be between 0.0 and 2.0, got {0}")]
    InvalidTemperature(f32),

    #[error("max_context_chars must be greater than 0")]
    InvalidContextBudget,

    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    FileParse {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5555,
        }
    }
}

/// Which search structure serves the persisted documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Exact L2 search over every document
    #[default]
    Flat,
    /// Approximate search, for corpora too large to scan per request
    Hnsw,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub path: PathBuf,
    pub kind: IndexKind,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("faiss_index_can"),
            kind: IndexKind::Flat,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model_name: String,
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    /// sentence-transformers leaves embeddings unnormalized unless asked to
    pub normalize: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: "all-MiniLM-L6-v2".to_string(),
            model_path: PathBuf::from("models/all-MiniLM-L6-v2-onnx/model.onnx"),
            tokenizer_path: PathBuf::from("models/all-MiniLM-L6-v2-onnx/tokenizer.json"),
            normalize: false,
        }
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash-lite".to_string(),
            temperature: 0.1,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout_secs: 120,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Upper bound on the joined context, in characters
    pub max_context_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            max_context_chars: 24_000,
        }
    }
}

/// How `POST /api/chat` reports a failed retrieval or generation call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// 502 with an error envelope
    Reject,
    /// 200 with an apology string in `response`
    #[default]
    Apologize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatbotConfig {
    pub server: ServerConfig,
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub retrieval: RetrievalConfig,
    pub failure_mode: FailureMode,
}

impl ChatbotConfig {
    /// Load configuration from a TOML file; missing sections keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::FileParse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Checks everything the pipeline needs before any model is loaded
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.generation.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {}
            _ => return Err(ConfigError::MissingApiKey),
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::InvalidTopK);
        }
        let temperature = self.generation.temperature;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidTemperature(temperature));
        }
        if self.retrieval.max_context_chars == 0 {
            return Err(ConfigError::InvalidContextBudget);
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Picks the API key: the explicit value first, then each of
/// [`API_KEY_ENV_VARS`] through `lookup`. Blank values count as absent.
pub fn resolve_api_key<F>(explicit: Option<&str>, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    explicit
        .map(str::to_string)
        .into_iter()
        .chain(API_KEY_ENV_VARS.iter().filter_map(|name| lookup(*name)))
        .find(|key| !key.trim().is_empty())
}
