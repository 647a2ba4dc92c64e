// src/handlers/workflow.rs

use axum::{extract::State, Json};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::{response::ActionResponse, ticket::ClassifyPayload},
    services::auth::SessionContext,
};

// POST /api/tipificar
#[utoipa::path(
    post,
    path = "/api/tipificar",
    tag = "PQRS",
    request_body = ClassifyPayload,
    responses(
        (status = 200, description = "Atualização aplicada", body = ActionResponse),
        (status = 400, description = "Falta seq ou estado desconhecido"),
        (status = 403, description = "Papel, posse do caso ou campos não permitidos"),
        (status = 404, description = "Caso não encontrado")
    ),
    security(("session_cookie" = []))
)]
pub async fn classify(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: SessionContext,
    Json(payload): Json<ClassifyPayload>,
) -> Result<Json<ActionResponse>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let outcome = app_state
        .ticket_service
        .classify(&ctx, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ActionResponse::ok(
        app_state.i18n_store.translate(&locale.0, outcome.message_key()),
    )))
}
