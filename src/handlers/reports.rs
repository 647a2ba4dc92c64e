// src/handlers/reports.rs

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{RequireRole, StaffManagers},
    },
    models::{report::TicketStats, ticket::TicketListQuery},
    services::{auth::SessionContext, export::XLSX_CONTENT_TYPE},
};

// GET /api/estadisticas-pqrs
#[utoipa::path(
    get,
    path = "/api/estadisticas-pqrs",
    tag = "Reportes",
    responses(
        (status = 200, description = "Contagem por estado, vencidas e total", body = TicketStats)
    ),
    security(("session_cookie" = []))
)]
pub async fn stats(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: SessionContext,
) -> Result<Json<TicketStats>, ApiError> {
    let stats = app_state
        .report_service
        .stats(&ctx)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(stats))
}

// GET /api/exportar-respuestas
#[utoipa::path(
    get,
    path = "/api/exportar-respuestas",
    tag = "Reportes",
    params(TicketListQuery),
    responses(
        (status = 200, description = "Planilha .xlsx", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        (status = 403, description = "Só administrador e analista")
    ),
    security(("session_cookie" = []))
)]
pub async fn export_tickets(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: SessionContext,
    _guard: RequireRole<StaffManagers>,
    Query(query): Query<TicketListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let file = app_state
        .report_service
        .export(&ctx, &query)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", file.file_name),
            ),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        file.bytes,
    ))
}
