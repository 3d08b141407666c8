use super::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready once a marketplace token can be resolved: either a static token or
/// a token sheet is configured.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    if state.pipeline.has_token_source() {
        (StatusCode::OK, Json(serde_json::json!({"status": "ready"})))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "unconfigured",
                "reason": "set MELI_ACCESS_TOKEN or GS_SHEET_ID/GS_API_KEY",
            })),
        )
    }
}
