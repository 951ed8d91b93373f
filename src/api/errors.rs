// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MSG_NO_DATA: &str = "Aucune donnée fournie";
pub const MSG_EMPTY_MESSAGE: &str = "Le message ne peut pas être vide";
pub const MSG_UNEXPECTED: &str = "Une erreur est survenue";
pub const MSG_GENERATION_UNAVAILABLE: &str = "Le service de génération est indisponible";
pub const MSG_CHATBOT_UNAVAILABLE: &str = "Le chatbot n'est pas disponible";
pub const MSG_NOT_FOUND: &str = "Endpoint non trouvé";
pub const MSG_INTERNAL: &str = "Erreur interne du serveur";

/// JSON error envelope shared by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Request carried no usable JSON body
    NoData,
    /// `message` absent, null or blank
    EmptyMessage,
    /// Body could not be interpreted (bad JSON, wrong types)
    Unexpected(String),
    /// The generation pipeline failed
    BadGateway(String),
    ChatbotUnavailable,
    NotFound { path: String },
    Internal,
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        let (error, details, path) = match self {
            ApiError::NoData => (MSG_NO_DATA, None, None),
            ApiError::EmptyMessage => (MSG_EMPTY_MESSAGE, None, None),
            ApiError::Unexpected(details) => (MSG_UNEXPECTED, Some(details.clone()), None),
            ApiError::BadGateway(details) => {
                (MSG_GENERATION_UNAVAILABLE, Some(details.clone()), None)
            }
            ApiError::ChatbotUnavailable => (MSG_CHATBOT_UNAVAILABLE, None, None),
            ApiError::NotFound { path } => (MSG_NOT_FOUND, None, Some(path.clone())),
            ApiError::Internal => (MSG_INTERNAL, None, None),
        };

        ErrorResponse {
            error: error.to_string(),
            details,
            path,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NoData | ApiError::EmptyMessage => StatusCode::BAD_REQUEST,
            ApiError::Unexpected(_) | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::ChatbotUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NoData => write!(f, "No request data"),
            ApiError::EmptyMessage => write!(f, "Empty message"),
            ApiError::Unexpected(msg) => write!(f, "Unexpected error: {}", msg),
            ApiError::BadGateway(msg) => write!(f, "Generation failed: {}", msg),
            ApiError::ChatbotUnavailable => write!(f, "Chatbot not loaded"),
            ApiError::NotFound { path } => write!(f, "Not found: {}", path),
            ApiError::Internal => write!(f, "Internal server error"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_response())).into_response()
    }
}
