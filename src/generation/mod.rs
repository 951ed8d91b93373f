// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Generation providers
//!
//! The hosted LLM that turns an assembled prompt into the final answer.

pub mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by a generation provider
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Connection or transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// The provider did not answer within the configured timeout
    #[error("Generation timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Non-success HTTP status from the provider
    #[error("Generation API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The response body could not be decoded
    #[error("Malformed generation response: {0}")]
    MalformedResponse(String),

    /// The provider answered without any text
    #[error("Empty generation response: {0}")]
    EmptyResponse(String),
}

/// Produces a completion for a prompt
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, GenerationError>;

    /// Model identifier, for logging
    fn model_name(&self) -> &str;
}
