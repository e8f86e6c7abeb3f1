pub mod analyze;
pub mod classify;

use axum::{
    extract::DefaultBodyLimit,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::state::{AppState, HealthResponse};

pub fn api_router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.config.max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(1);

    Router::new()
        .route("/health", get(health))
        .route(
            "/analyze",
            post(analyze::analyze).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/classify", post(classify::classify))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use quality::Analyzer;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::api_router;
    use crate::config::ServerConfig;
    use crate::state::AppState;

    fn app_with(config: ServerConfig) -> Router {
        let analyzer = Analyzer::new(config.analyzer_config()).unwrap();
        api_router(AppState {
            analyzer: Arc::new(analyzer),
            config: Arc::new(config),
        })
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        send_to(app_with(ServerConfig::default()), request).await
    }

    async fn send_to(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn cbr_128_stream(frames: usize) -> Vec<u8> {
        let mut out = Vec::new();
        for _ in 0..frames {
            let mut frame = vec![0u8; 418];
            frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x92, 0x64]);
            out.extend(frame);
        }
        out
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn analyze_rejects_non_mp3() {
        let request = Request::builder()
            .method("POST")
            .uri("/analyze?filename=evil.mp3")
            .body(Body::from("#!/bin/sh\nrm -rf /"))
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["kind"], "invalid_format");
    }

    #[tokio::test]
    async fn oversized_uploads_get_json_error() {
        let small = || {
            app_with(ServerConfig {
                max_upload_bytes: 16,
                ..ServerConfig::default()
            })
        };

        let request = Request::builder()
            .method("POST")
            .uri("/analyze")
            .body(Body::from(vec![0xFFu8; 4096]))
            .unwrap();
        let (status, body) = send_to(small(), request).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["kind"], "too_large");

        let request = Request::builder()
            .method("POST")
            .uri("/analyze")
            .header("content-length", "4096")
            .body(Body::from(vec![0xFFu8; 8]))
            .unwrap();
        let (status, body) = send_to(small(), request).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["kind"], "too_large");

        let request = Request::builder()
            .method("POST")
            .uri("/analyze")
            .body(Body::from(vec![0xFFu8; 17]))
            .unwrap();
        let (status, body) = send_to(small(), request).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["kind"], "too_large");
    }

    #[tokio::test]
    async fn analyze_scores_untagged_stream() {
        let request = Request::builder()
            .method("POST")
            .uri("/analyze")
            .header("x-filename", "uploads/demo.mp3")
            .body(Body::from(cbr_128_stream(40)))
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["filename"], "demo.mp3");
        assert_eq!(body["report"]["metadata_score"], 0);
        assert_eq!(body["report"]["audio_score"], 10);
        assert_eq!(body["report"]["professional_score"], 30);
        assert_eq!(body["report"]["total_score"], 40);
        assert_eq!(body["audio"]["bitrate_mode"], "constant");
        assert_eq!(body["passed"], false);
        assert_eq!(body["display_recommendations"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn classify_accepts_totals_and_durations() {
        let (status, body) = send(post_json(
            "/classify",
            r#"{"track_count": 3, "total_duration_minutes": 31.0}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["release_type"], "album");

        let (status, body) = send(post_json(
            "/classify",
            r#"{"durations_seconds": [200.0, 180.5]}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["release_type"], "ep");
        assert_eq!(body["label"], "EP");
    }

    #[tokio::test]
    async fn classify_rejects_empty_batches() {
        let (status, _) = send(post_json("/classify", r#"{"track_count": 0}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(post_json("/classify", r#"{"durations_seconds": []}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
