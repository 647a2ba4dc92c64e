// src/handlers/health.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;

use crate::config::AppState;

// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Saúde",
    responses((status = 200, description = "Processo vivo"))
)]
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "service": "pqrs-backend",
        "time": Utc::now().to_rfc3339(),
    }))
}

// GET /api/db-ping
#[utoipa::path(
    get,
    path = "/api/db-ping",
    tag = "Saúde",
    responses(
        (status = 200, description = "Banco respondeu"),
        (status = 500, description = "Banco indisponível")
    )
)]
pub async fn db_ping(State(app_state): State<AppState>) -> impl IntoResponse {
    match app_state.report_service.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "ok": true, "db": 1 }))),
        Err(e) => {
            tracing::error!(error = %e, "db-ping falhou");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false, "error": "Error de servidor" })),
            )
        }
    }
}
