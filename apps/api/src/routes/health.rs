use axum::Json;
use serde_json::{json, Value};

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": "0.1.0",
        "service": "jobwatch-api"
    }))
}

/// GET /api/
/// Root banner so a browser hit confirms the API is up.
pub async fn api_banner() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Job tracker API is running",
        "version": "0.1.0"
    }))
}
