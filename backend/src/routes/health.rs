use axum::Json;
use serde_json::{Value, json};

use research_upstream::{available_engines, available_tools};

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "engines": available_engines().len(),
        "tools": available_tools().len(),
    }))
}
