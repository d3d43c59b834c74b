use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt as _;
use tower::util::ServiceExt as _;

use backend::{routes, state::AppState};
use research_relay::{DriverConfig, RetryPolicy};
use research_upstream::{
    DeltaStream, RawDelta, Run, RunHandle, RunRequest, RunResult, RunStatus, RunTransport,
    UpstreamError,
};

struct ScriptedTransport;

#[async_trait]
impl RunTransport for ScriptedTransport {
    async fn submit(&self, _request: &RunRequest) -> Result<RunHandle, UpstreamError> {
        Ok(RunHandle {
            run_id: "run-http".into(),
        })
    }

    async fn open_stream(&self, _handle: &RunHandle) -> Result<DeltaStream, UpstreamError> {
        Ok(Box::pin(futures::stream::iter(vec![
            Ok(RawDelta::Content {
                content: Some("looking at primary sources".into()),
            }),
            Ok(RawDelta::Done { run_id: None }),
        ])))
    }

    async fn poll(&self, run_id: &str) -> Result<Run, UpstreamError> {
        Ok(Run {
            run_id: run_id.into(),
            status: RunStatus::Succeeded,
            result: Some(RunResult {
                answer: Some(serde_json::Value::String(
                    "A concise summary of the findings.".into(),
                )),
                reasoning: None,
            }),
            error: None,
        })
    }

    async fn cancel(&self, _run_id: &str) -> Result<(), UpstreamError> {
        Ok(())
    }
}

fn test_state() -> AppState {
    let driver = DriverConfig {
        retry: RetryPolicy::new(2, Duration::from_millis(1)),
        poll_interval: Duration::from_millis(1),
        poll_max_wait: Duration::from_millis(500),
        ..DriverConfig::default()
    };
    AppState::new(Arc::new(ScriptedTransport), driver)
}

#[tokio::test]
async fn health_returns_ok() {
    let app = routes::router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn engines_and_tools_are_listed() {
    let app = routes::router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/research/engines")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let engines: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(
        engines
            .as_array()
            .unwrap()
            .iter()
            .any(|e| e["id"] == "tim-gpt")
    );

    let app = routes::router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/research/tools")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let tools: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(
        tools
            .as_array()
            .unwrap()
            .iter()
            .any(|t| t["id"] == "web_search")
    );
}

#[tokio::test]
async fn cancel_unknown_run_reports_false() {
    let app = routes::router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/research/cancel/run-missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["cancelled"], false);
}

#[tokio::test]
async fn analyze_stream_relays_events_and_done_sentinel() {
    let app = routes::router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/research/analyze/stream")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"topic": "history of async rust runtimes"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"), "{content_type}");
    assert_eq!(
        response
            .headers()
            .get("x-accel-buffering")
            .and_then(|v| v.to_str().ok()),
        Some("no")
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("run_started"), "{text}");
    assert!(text.contains("\"type\":\"done\""), "{text}");
    assert!(text.trim_end().ends_with("data: [DONE]"), "{text}");
}

#[tokio::test]
async fn invalid_topic_surfaces_as_error_event() {
    let app = routes::router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/research/analyze/stream")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"topic": "x"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("\"type\":\"error\""), "{text}");
    assert!(text.contains("[DONE]"), "{text}");
}
