// src/handlers/users.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{RequireRole, StaffManagers, Supervisors},
    },
    models::{
        auth::{CreateUserPayload, ToggleActivePayload, UpdateUserPayload, User, UserOption, UserSearchQuery},
        response::ActionResponse,
    },
    services::auth::SessionContext,
};

// =============================================================================
//  CADASTRO
// =============================================================================

// POST /api/usuarios
#[utoipa::path(
    post,
    path = "/api/usuarios",
    tag = "Usuarios",
    request_body = CreateUserPayload,
    responses(
        (status = 201, description = "Usuário criado", body = ActionResponse),
        (status = 400, description = "Campos faltando ou usuário já existe"),
        (status = 403, description = "Papel sem acesso")
    ),
    security(("session_cookie" = []))
)]
pub async fn create_user(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: SessionContext,
    _guard: RequireRole<StaffManagers>,
    Json(payload): Json<CreateUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let id = app_state
        .user_service
        .create(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tracing::info!(created_by = ctx.user_id, user_id = id, "Cadastro de usuário");

    Ok((
        StatusCode::CREATED,
        Json(ActionResponse::ok(app_state.i18n_store.translate(&locale.0, "user_created"))),
    ))
}

// PATCH /api/usuarios/{id}
#[utoipa::path(
    patch,
    path = "/api/usuarios/{id}",
    tag = "Usuarios",
    request_body = UpdateUserPayload,
    params(("id" = i64, Path, description = "Id do usuário")),
    responses(
        (status = 200, description = "Usuário atualizado", body = ActionResponse),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(("session_cookie" = []))
)]
pub async fn update_user(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<StaffManagers>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<Json<ActionResponse>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .user_service
        .update(id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ActionResponse::ok(
        app_state.i18n_store.translate(&locale.0, "user_updated"),
    )))
}

// PATCH /api/inactivar-usuario/{id}
#[utoipa::path(
    patch,
    path = "/api/inactivar-usuario/{id}",
    tag = "Usuarios",
    request_body = ToggleActivePayload,
    params(("id" = i64, Path, description = "Id do usuário")),
    responses(
        (status = 200, description = "Flag alterado", body = ActionResponse),
        (status = 400, description = "Falta o campo activo"),
        (status = 404, description = "Não encontrado")
    ),
    security(("session_cookie" = []))
)]
pub async fn toggle_active(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<StaffManagers>,
    Path(id): Path<i64>,
    Json(payload): Json<ToggleActivePayload>,
) -> Result<Json<ActionResponse>, ApiError> {
    let active = app_state
        .user_service
        .set_active(id, payload.active)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let key = if active { "user_activated" } else { "user_deactivated" };
    Ok(Json(ActionResponse::ok(app_state.i18n_store.translate(&locale.0, key))))
}

// =============================================================================
//  CONSULTAS
// =============================================================================

// GET /api/buscar-usuario?q=
#[utoipa::path(
    get,
    path = "/api/buscar-usuario",
    tag = "Usuarios",
    params(UserSearchQuery),
    responses(
        (status = 200, description = "Primeiro usuário encontrado", body = User),
        (status = 400, description = "Falta q"),
        (status = 404, description = "Nenhum usuário")
    ),
    security(("session_cookie" = []))
)]
pub async fn search_user(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<StaffManagers>,
    Query(query): Query<UserSearchQuery>,
) -> Result<Json<User>, ApiError> {
    let user = app_state
        .user_service
        .search(query.q.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(user))
}

// GET /api/usuarios-por-rol/{rol_id}
#[utoipa::path(
    get,
    path = "/api/usuarios-por-rol/{rol_id}",
    tag = "Usuarios",
    params(("rol_id" = i64, Path, description = "1 admin, 2 analista, 3 responsable, 4 auditor")),
    responses(
        (status = 200, description = "Usuários do papel", body = Vec<UserOption>)
    ),
    security(("session_cookie" = []))
)]
pub async fn users_by_role(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<Supervisors>,
    Path(role_id): Path<i64>,
) -> Result<Json<Vec<UserOption>>, ApiError> {
    let users = app_state
        .user_service
        .list_by_role(role_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(users))
}
