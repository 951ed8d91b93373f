// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::errors::ApiError;
use super::http_server::AppState;
use crate::config::FailureMode;
use crate::version::VERSION_NUMBER;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Endpoints {
    pub home: String,
    pub health: String,
    pub chat: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HomeResponse {
    pub message: String,
    pub version: String,
    pub status: String,
    pub endpoints: Endpoints,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub chatbot_loaded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    pub response: String,
    pub timestamp: String,
    pub status: String,
}

/// Local wall-clock time, ISO-8601 with microseconds and no offset
pub fn timestamp() -> String {
    chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

pub async fn home_handler() -> Json<HomeResponse> {
    info!("🏠 Home endpoint called");
    Json(HomeResponse {
        message: "🏆 Chatbot CAN 2025 API".to_string(),
        version: VERSION_NUMBER.to_string(),
        status: "✅ En ligne".to_string(),
        endpoints: Endpoints {
            home: "GET /".to_string(),
            health: "GET /api/health".to_string(),
            chat: "POST /api/chat".to_string(),
        },
    })
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    info!("🏥 Health check called");
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: timestamp(),
        chatbot_loaded: state.chatbot.is_some(),
    })
}

pub async fn options_handler() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn not_found_handler(uri: Uri) -> ApiError {
    warn!("⚠️ 404 - Route not found: {}", uri.path());
    ApiError::NotFound {
        path: uri.path().to_string(),
    }
}

/// Mirrors the truthiness test applied to the decoded body
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(_) => false,
    }
}

/// `application/json` or any `+json` media type, parameters ignored
fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// Extracts the trimmed question from a raw `/api/chat` body
///
/// The body is only decoded when `content_type` is a JSON media type.
pub fn parse_chat_body(content_type: Option<&str>, body: &[u8]) -> Result<String, ApiError> {
    if !content_type.is_some_and(is_json_content_type) {
        return Err(ApiError::Unexpected(format!(
            "Unsupported Media Type: expected Content-Type 'application/json', got {}",
            content_type.map_or_else(|| "none".to_string(), |ct| format!("'{}'", ct))
        )));
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::NoData);
    }

    let data: Value =
        serde_json::from_slice(body).map_err(|e| ApiError::Unexpected(e.to_string()))?;
    if is_falsy(&data) {
        return Err(ApiError::NoData);
    }

    let object = data.as_object().ok_or_else(|| {
        ApiError::Unexpected("request body must be a JSON object".to_string())
    })?;

    let message = match object.get("message") {
        None | Some(Value::Null) => "",
        Some(Value::String(message)) => message.trim(),
        Some(other) => {
            return Err(ApiError::Unexpected(format!(
                "'message' must be a string, got {}",
                other
            )))
        }
    };

    if message.is_empty() {
        return Err(ApiError::EmptyMessage);
    }
    Ok(message.to_string())
}

pub async fn chat_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ChatResponse>, ApiError> {
    info!("💬 Chat endpoint called");

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let question = parse_chat_body(content_type, &body).map_err(|e| {
        error!("❌ Rejected chat request: {}", e);
        e
    })?;
    info!("📩 Question: {}", question);

    let chatbot = state.chatbot.as_ref().ok_or(ApiError::ChatbotUnavailable)?;

    let response = match state.failure_mode {
        FailureMode::Reject => match chatbot.answer(&question).await {
            Ok(answer) => answer.text,
            Err(e) => {
                error!("❌ {} stage failed: {}", e.stage(), e);
                return Err(ApiError::BadGateway(e.to_string()));
            }
        },
        FailureMode::Apologize => chatbot.answer_or_apology(&question).await,
    };

    let preview: String = response.chars().take(50).collect();
    info!("✅ Response: {}...", preview);

    Ok(Json(ChatResponse {
        response,
        timestamp: timestamp(),
        status: "success".to_string(),
    }))
}
