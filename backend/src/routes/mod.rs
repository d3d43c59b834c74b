use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

pub mod health;
pub mod research;

pub fn router(state: AppState) -> Router {
    let research = Router::new()
        .route("/health", get(health::health))
        .route("/analyze/stream", post(research::analyze_stream))
        .route("/cancel/{run_id}", post(research::cancel_run))
        .route("/engines", get(research::list_engines))
        .route("/tools", get(research::list_tools));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/research", research)
        .with_state(state)
}
