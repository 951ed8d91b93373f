// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::errors::ApiError;
use super::handlers::{
    chat_handler, health_handler, home_handler, not_found_handler, options_handler,
};
use crate::config::FailureMode;
use crate::rag::Chatbot;

const ALLOW_ORIGIN: &str = "*";
const ALLOW_METHODS: &str = "GET, POST, OPTIONS, PUT, DELETE";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Shared, read-only request context
#[derive(Clone, Debug)]
pub struct AppState {
    /// `None` only when the server runs without a loaded pipeline
    pub chatbot: Option<Arc<Chatbot>>,
    pub failure_mode: FailureMode,
}

impl AppState {
    pub fn new(chatbot: Chatbot, failure_mode: FailureMode) -> Self {
        Self {
            chatbot: Some(Arc::new(chatbot)),
            failure_mode,
        }
    }

    pub fn without_chatbot() -> Self {
        Self {
            chatbot: None,
            failure_mode: FailureMode::default(),
        }
    }
}

/// Builds the router with every route and layer
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(home_handler).options(options_handler))
        .route("/api/health", get(health_handler).options(options_handler))
        .route("/api/chat", post(chat_handler).options(options_handler))
        .fallback(not_found_handler)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(log_requests))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static(ALLOW_ORIGIN),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn header_or<'a>(request: &'a Request, name: HeaderName, default: &'a str) -> &'a str {
    request
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(default)
}

async fn log_requests(request: Request, next: Next) -> Response {
    let origin = header_or(&request, header::ORIGIN, "Direct").to_string();
    let user_agent: String = header_or(&request, header::USER_AGENT, "Unknown")
        .chars()
        .take(50)
        .collect();

    info!("📥 {} {}", request.method(), request.uri().path());
    info!("   Origin: {}", origin);
    info!("   User-Agent: {}", user_agent);

    let response = next.run(request).await;
    info!("📤 Status: {}", response.status().as_u16());
    response
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("❌ 500 - Server error: {}", details);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::Internal.to_response()),
    )
        .into_response()
}

/// Serves `create_app(state)` on `addr` until Ctrl-C
pub async fn start_server(addr: &str, state: AppState) -> anyhow::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("{}", "=".repeat(60));
    info!("🚀 Server ready");
    info!("📍 URL: http://{}", listener.local_addr()?);
    info!("{}", "=".repeat(60));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
