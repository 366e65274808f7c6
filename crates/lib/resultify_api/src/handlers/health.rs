//! Root greeting.

use axum::Json;
use serde_json::{Value, json};

/// `GET /`: liveness greeting with the core version.
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "Welcome to Resultify",
        "version": resultify_core::version(),
    }))
}
