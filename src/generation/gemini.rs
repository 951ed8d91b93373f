// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Google Gemini client via the Generative Language API (v1beta, text-only)

use super::{GenerationError, GenerationProvider};
use crate::config::GenerationConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Client for `models/{model}:generateContent`
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

// --- Request types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationSettings,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationSettings {
    temperature: f32,
}

// --- Response types ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
pub struct ContentPart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl GenerateContentResponse {
    /// Concatenates the text parts of the first candidate that has any
    pub fn into_text(self) -> Result<String, GenerationError> {
        let block_reason = self
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason);

        let mut finish_reason = None;
        for candidate in self.candidates {
            let text: String = candidate
                .content
                .map(|content| {
                    content
                        .parts
                        .into_iter()
                        .filter_map(|part| part.text)
                        .collect()
                })
                .unwrap_or_default();
            if !text.is_empty() {
                return Ok(text);
            }
            finish_reason = finish_reason.or(candidate.finish_reason);
        }

        let reason = block_reason
            .map(|r| format!("prompt blocked ({})", r))
            .or_else(|| finish_reason.map(|r| format!("finish reason {}", r)))
            .unwrap_or_else(|| "no candidates returned".to_string());
        Err(GenerationError::EmptyResponse(reason))
    }
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        let base_url = base_url.trim_end_matches('/').to_string();
        info!(
            "Gemini client configured: endpoint={}, model={}, timeout={}s",
            base_url, model, timeout_secs
        );

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout_secs,
        })
    }

    /// Builds the client from validated configuration
    pub fn from_config(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let api_key = config.api_key.as_deref().unwrap_or_default();
        Self::new(&config.base_url, api_key, &config.model, config.timeout_secs)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn map_error(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            GenerationError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl GenerationProvider for GeminiClient {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, GenerationError> {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationSettings { temperature },
        };

        debug!(
            "Sending {} prompt chars to {} (temperature {})",
            prompt.chars().count(),
            self.model,
            temperature
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_error(e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(text);
            warn!("Gemini returned {}: {}", status, message);
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;
        parsed.into_text()
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
