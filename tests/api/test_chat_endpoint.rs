// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /api/chat: body validation, the happy path, and how provider
//! failures surface under each failure mode.

use super::support::*;
use axum::{
    body::Body,
    http::{Method, StatusCode},
};
use can_chatbot::{
    api::{create_app, AppState},
    config::{ChatbotConfig, FailureMode},
    generation::GenerationError,
};
use serde_json::json;

fn unused_generator() -> MockGenerator {
    let mut generator = named_generator();
    generator.expect_generate().times(0);
    generator
}

#[tokio::test]
async fn test_winning_goal_question() {
    let mut generator = named_generator();
    generator
        .expect_generate()
        .withf(|prompt, temperature| {
            prompt.contains("Brahim Díaz (Real Madrid) à la 90e minute")
                && prompt.contains("Question: Qui a marqué le but vainqueur en finale ?\n")
                && (*temperature - 0.1).abs() < f32::EPSILON
        })
        .times(1)
        .returning(|_, _| Ok("Brahim Díaz a marqué à la 90e minute.".to_string()));

    let app = app_with(generator, FailureMode::Reject);
    let response = post_chat(
        app,
        r#"{"message": "Qui a marqué le but vainqueur en finale ?"}"#,
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_cors(&response.headers);
    let body = response.json();
    assert_eq!(body["status"], "success");
    assert_eq!(body["response"], "Brahim Díaz a marqué à la 90e minute.");
    assert_iso_timestamp(&body["timestamp"]);
}

#[tokio::test]
async fn test_message_is_trimmed_and_extra_fields_ignored() {
    let mut generator = named_generator();
    generator
        .expect_generate()
        .withf(|prompt, _| prompt.contains("Question: Où se joue la finale ?\n"))
        .times(1)
        .returning(|_, _| Ok("À Rabat.".to_string()));

    let app = app_with(generator, FailureMode::Reject);
    let response = post_chat(
        app,
        r#"{"message": "   Où se joue la finale ?  ", "conversationHistory": [{"role": "user"}]}"#,
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["response"], "À Rabat.");
}

#[tokio::test]
async fn test_missing_message_key() {
    let app = app_with(unused_generator(), FailureMode::Reject);
    let response = post_chat(app, "{}").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_cors(&response.headers);
    assert_eq!(
        response.json(),
        json!({"error": "Le message ne peut pas être vide"})
    );
}

#[tokio::test]
async fn test_blank_or_null_message() {
    for body in [r#"{"message": ""}"#, r#"{"message": "   "}"#, r#"{"message": null}"#] {
        let app = app_with(unused_generator(), FailureMode::Reject);
        let response = post_chat(app, body).await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST, "body {}", body);
        assert_eq!(response.json()["error"], "Le message ne peut pas être vide");
    }
}

#[tokio::test]
async fn test_no_data() {
    for body in ["", "null", "false", "[]"] {
        let app = app_with(unused_generator(), FailureMode::Reject);
        let response = post_chat(app, body).await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST, "body {:?}", body);
        assert_eq!(response.json(), json!({"error": "Aucune donnée fournie"}));
    }
}

#[tokio::test]
async fn test_malformed_json_is_500_with_details() {
    let app = app_with(unused_generator(), FailureMode::Reject);
    let response = post_chat(app, r#"{"message": "Qui"#).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_cors(&response.headers);
    let body = response.json();
    assert_eq!(body["error"], "Une erreur est survenue");
    assert!(body["details"].as_str().is_some_and(|d| !d.is_empty()));
}

#[tokio::test]
async fn test_non_string_message_is_500() {
    let app = app_with(unused_generator(), FailureMode::Reject);
    let response = post_chat(app, r#"{"message": ["Qui", "a", "gagné"]}"#).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["error"], "Une erreur est survenue");
}

#[tokio::test]
async fn test_provider_failure_rejected_as_502() {
    let mut generator = named_generator();
    generator.expect_generate().times(1).returning(|_, _| {
        Err(GenerationError::Api {
            status: 429,
            message: "Resource has been exhausted".to_string(),
        })
    });

    let app = app_with(generator, FailureMode::Reject);
    let response = post_chat(app, r#"{"message": "Qui a gagné ?"}"#).await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_cors(&response.headers);
    let body = response.json();
    assert_eq!(body["error"], "Le service de génération est indisponible");
    assert!(body["details"]
        .as_str()
        .is_some_and(|d| d.contains("Resource has been exhausted")));
}

#[tokio::test]
async fn test_provider_failure_apologized_as_200() {
    let mut generator = named_generator();
    generator
        .expect_generate()
        .times(1)
        .returning(|_, _| Err(GenerationError::Timeout { timeout_secs: 120 }));

    let app = app_with(generator, FailureMode::Apologize);
    let response = post_chat(app, r#"{"message": "Qui a gagné ?"}"#).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "success");
    let text = body["response"].as_str().unwrap();
    assert!(text.starts_with("Désolé, une erreur est survenue: "));
    assert!(text.contains("120s"));
}

#[tokio::test]
async fn test_chatbot_not_loaded() {
    let app = create_app(AppState::without_chatbot());
    let response = post_chat(app, r#"{"message": "Qui a gagné ?"}"#).await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_cors(&response.headers);
    assert_eq!(
        response.json(),
        json!({"error": "Le chatbot n'est pas disponible"})
    );
}

#[tokio::test]
async fn test_panic_becomes_internal_error() {
    let app = app_with(PanickingGenerator, FailureMode::Reject);
    let response = post_chat(app, r#"{"message": "Qui a gagné ?"}"#).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_cors(&response.headers);
    assert_eq!(response.json(), json!({"error": "Erreur interne du serveur"}));
}

#[tokio::test]
async fn test_concurrent_requests_share_one_chatbot() {
    let mut generator = named_generator();
    generator
        .expect_generate()
        .times(8)
        .returning(|prompt, _| {
            let question = prompt.rsplit("Question: ").next().unwrap_or_default();
            Ok(format!("Réponse à {}", question.trim_end_matches("\n\nRéponse:")))
        });
    let app = app_with(generator, FailureMode::Reject);

    let requests = (0..8).map(|i| {
        let app = app.clone();
        async move {
            let body = format!(r#"{{"message": "Question {}"}}"#, i);
            (i, post_chat(app, &body).await)
        }
    });

    for (i, response) in futures::future::join_all(requests).await {
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json()["response"], format!("Réponse à Question {}", i));
    }
}

#[tokio::test]
async fn test_default_mode_answers_200_on_provider_failure() {
    let mut generator = named_generator();
    generator.expect_generate().times(1).returning(|_, _| {
        Err(GenerationError::Api {
            status: 429,
            message: "Resource has been exhausted".to_string(),
        })
    });

    let app = app_with(generator, ChatbotConfig::default().failure_mode);
    let response = post_chat(app, r#"{"message": "Qui a gagné ?"}"#).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "success");
    let text = body["response"].as_str().unwrap();
    assert!(text.starts_with("Désolé, une erreur est survenue: "));
    assert!(text.contains("Resource has been exhausted"));
}

#[tokio::test]
async fn test_non_json_content_type_is_500() {
    for content_type in [None, Some("text/plain")] {
        let app = app_with(unused_generator(), FailureMode::Apologize);
        let response = send_with_content_type(
            app,
            Method::POST,
            "/api/chat",
            content_type,
            Body::from(r#"{"message": "Qui a gagné ?"}"#),
        )
        .await;

        assert_eq!(
            response.status,
            StatusCode::INTERNAL_SERVER_ERROR,
            "{:?}",
            content_type
        );
        assert_cors(&response.headers);
        let body = response.json();
        assert_eq!(body["error"], "Une erreur est survenue");
        assert!(body["details"]
            .as_str()
            .is_some_and(|d| d.contains("Content-Type")));
    }
}
