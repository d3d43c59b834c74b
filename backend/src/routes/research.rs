use std::convert::Infallible;

use axum::{
    Json,
    extract::{Path, State},
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::Stream;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};

use research_relay::{ResearchRequest, start_run};
use research_upstream::{EngineInfo, ToolInfo, available_engines, available_tools};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub topic: String,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub tools: Option<Vec<String>>,
    #[serde(default = "default_include_arxiv")]
    pub include_arxiv: bool,
}

fn default_include_arxiv() -> bool {
    true
}

/// Streams one research run as SSE. Each frame is a JSON event; the stream
/// ends with a literal `[DONE]` frame after the terminal event.
pub async fn analyze_stream(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> impl IntoResponse {
    info!(topic = %request.topic, engine = ?request.engine, "starting research run");
    let mut relay = start_run(
        state.transport.clone(),
        state.active_runs.clone(),
        state.driver.clone(),
        ResearchRequest {
            topic: request.topic,
            engine: request.engine,
            tools: request.tools,
            include_arxiv: request.include_arxiv,
        },
    );

    let stream: std::pin::Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>> =
        Box::pin(async_stream::stream! {
            while let Some(event) = relay.next_event().await {
                match serde_json::to_string(&event) {
                    Ok(data) => yield Ok(Event::default().data(data)),
                    Err(err) => error!(error = %err, "failed to serialize relay event"),
                }
            }
            yield Ok(Event::default().data("[DONE]"));
        });

    (
        [
            ("cache-control", "no-cache, no-transform"),
            ("x-accel-buffering", "no"),
        ],
        Sse::new(stream).keep_alive(KeepAlive::default()),
    )
}

/// Cancels an in-flight run by its upstream run id.
pub async fn cancel_run(State(state): State<AppState>, Path(run_id): Path<String>) -> Json<Value> {
    let cancelled = state.active_runs.cancel(&run_id);
    info!(run_id = %run_id, cancelled, "cancel requested");
    Json(json!({ "cancelled": cancelled }))
}

pub async fn list_engines() -> Json<&'static [EngineInfo]> {
    Json(available_engines())
}

pub async fn list_tools() -> Json<&'static [ToolInfo]> {
    Json(available_tools())
}
