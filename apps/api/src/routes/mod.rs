pub mod health;

use axum::{routing::get, Router};

use crate::state::AppState;
use crate::tailor::handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/tailor",
            get(handlers::handle_status).post(handlers::handle_tailor),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use bytes::Bytes;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::document::ValidationMode;
    use crate::llm_client::ProviderError;
    use crate::render::backend::BackendFailure;
    use crate::render::orchestrator::tests::fake_pdf;
    use crate::tailor::service::tests::{harness, Harness, TAILORED};

    fn app(h: Harness) -> (Router, Harness) {
        let state = AppState {
            tailor: h.service.clone(),
        };
        (build_router(state), h)
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_of(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (router, _h) = app(harness(vec![], Ok(fake_pdf(8192)), ValidationMode::Blocking));

        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_of(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_tailor_returns_pdf_with_headers() {
        let (router, _h) = app(harness(
            vec![Ok(TAILORED.to_string())],
            Ok(fake_pdf(8192)),
            ValidationMode::Blocking,
        ));

        let response = router
            .oneshot(post(
                "/api/v1/tailor",
                r#"{"job_description": "Senior Go Engineer, Kubernetes, gRPC"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
        let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=\"Resume_"));
        assert!(disposition.ends_with(".pdf\""));
        assert!(headers.contains_key("x-latex-content"));
        assert!(headers.contains_key("x-request-id"));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.len(), 8192);
        assert!(body.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_tailor_json_response() {
        let (router, _h) = app(harness(
            vec![Ok(TAILORED.to_string())],
            Ok(fake_pdf(4096)),
            ValidationMode::Blocking,
        ));

        let response = router
            .oneshot(post(
                "/api/v1/tailor?response=json",
                r#"{"keywords": "Go, Kubernetes, gRPC"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_of(response).await;
        assert_eq!(body["format"], "pdf");
        assert_eq!(body["size_bytes"], 4096);
        assert_eq!(body["document"], TAILORED);
        assert!(body["artifact_base64"].as_str().unwrap().starts_with("JVBER"));
    }

    #[tokio::test]
    async fn test_conflicting_input_is_bad_request() {
        let (router, h) = app(harness(vec![], Ok(fake_pdf(8192)), ValidationMode::Blocking));

        let response = router
            .oneshot(post(
                "/api/v1/tailor",
                r#"{"job_description": "Go", "keywords": ["Go"]}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_of(response).await["error"]["message"], "conflicting-task");
        assert_eq!(h.provider.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_null_keywords_are_dropped_before_validation() {
        let (router, _h) = app(harness(vec![], Ok(fake_pdf(8192)), ValidationMode::Blocking));

        let response = router
            .oneshot(post("/api/v1/tailor", r#"{"keywords": [null, "  "]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_of(response).await["error"]["message"], "no-task-specified");
    }

    #[tokio::test]
    async fn test_rate_limited_provider_is_service_unavailable() {
        let overloaded = || Err(ProviderError::new("[429 Too Many Requests] quota exceeded"));
        let (router, _h) = app(harness(
            vec![overloaded(), overloaded(), overloaded()],
            Ok(fake_pdf(8192)),
            ValidationMode::Blocking,
        ));

        let response = router
            .oneshot(post("/api/v1/tailor", r#"{"keywords": ["Go"]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "60");
        let body = json_of(response).await;
        assert_eq!(body["error"]["type"], "rate_limit");
        assert_eq!(body["error"]["retry_after"], 60);
    }

    #[tokio::test]
    async fn test_truncated_document_is_unprocessable() {
        let (router, _h) = app(harness(
            vec![Ok("\\documentclass{article}\\begin{document}".to_string())],
            Ok(fake_pdf(8192)),
            ValidationMode::Blocking,
        ));

        let response = router
            .oneshot(post("/api/v1/tailor", r#"{"keywords": ["Go"]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_render_failure_lists_backend_details() {
        let (router, _h) = app(harness(
            vec![Ok(TAILORED.to_string())],
            Err(BackendFailure::Status {
                status: 502,
                body: "bad gateway".to_string(),
            }),
            ValidationMode::Blocking,
        ));

        let response = router
            .oneshot(post("/api/v1/tailor", r#"{"keywords": ["Go"]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_of(response).await;
        assert_eq!(body["error"]["message"], "all-backends-exhausted");
        assert_eq!(body["error"]["details"][0]["backend"], "fake");
    }

    #[tokio::test]
    async fn test_status_reports_configuration() {
        let (router, _h) = app(harness(vec![], Ok(Bytes::new()), ValidationMode::Advisory));

        let response = router
            .oneshot(Request::builder().uri("/api/v1/tailor").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_of(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["configuration"]["validation_mode"], "advisory");
        assert_eq!(body["configuration"]["backends"][0], "fake");
        assert!(body["configuration"].get("renderer_available").is_none());
    }
}
