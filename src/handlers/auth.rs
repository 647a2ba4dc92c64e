// src/handlers/auth.rs

use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::{removal_cookie, session_cookie, session_id_from},
        i18n::Locale,
    },
    models::{
        auth::{LoginPayload, LoginResponse, User},
        response::{ActionResponse, DataResponse},
    },
    services::auth::SessionContext,
};

// POST /api/login
#[utoipa::path(
    post,
    path = "/api/login",
    tag = "Auth",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Sessão aberta (cookie pqrs.sid)", body = LoginResponse),
        (status = 401, description = "Credenciais inválidas"),
        (status = 403, description = "Usuário inativo ou sem papel")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    locale: Locale,
    jar: CookieJar,
    Json(payload): Json<LoginPayload>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let ctx = app_state
        .auth_service
        .login(&payload.username, &payload.password, session_id_from(&jar))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let jar = jar.add(session_cookie(ctx.session_id, &app_state.settings));

    Ok((
        jar,
        Json(LoginResponse {
            success: true,
            rol: ctx.role_name,
            rol_id: ctx.role.id(),
            user_id: ctx.user_id,
        }),
    ))
}

// POST /api/logout
#[utoipa::path(
    post,
    path = "/api/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Sessão encerrada", body = ActionResponse)
    )
)]
pub async fn logout(
    State(app_state): State<AppState>,
    locale: Locale,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ActionResponse>), ApiError> {
    if let Some(session_id) = session_id_from(&jar) {
        app_state
            .auth_service
            .logout(session_id)
            .await
            .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    }

    let jar = jar.add(removal_cookie(&app_state.settings));
    Ok((
        jar,
        Json(ActionResponse::ok(app_state.i18n_store.translate(&locale.0, "logged_out"))),
    ))
}

// GET /api/perfil
#[utoipa::path(
    get,
    path = "/api/perfil",
    tag = "Auth",
    responses(
        (status = 200, description = "Dados do usuário da sessão", body = DataResponse<User>),
        (status = 401, description = "Sem sessão")
    ),
    security(("session_cookie" = []))
)]
pub async fn profile(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: SessionContext,
) -> Result<Json<DataResponse<User>>, ApiError> {
    let user = app_state
        .user_service
        .profile(ctx.user_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(DataResponse::ok(user)))
}
