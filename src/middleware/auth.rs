// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::{AppState, Settings, SESSION_COOKIE, SESSION_TTL_SECS},
    services::auth::SessionContext,
};

pub const LOGIN_PAGE: &str = "/auth/index.html";

/// Cookie da sessão, reemitido a cada requisição autenticada (expiração deslizante).
pub fn session_cookie(session_id: Uuid, settings: &Settings) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .http_only(true)
        .path("/")
        .same_site(settings.cookie_same_site)
        .secure(settings.production)
        .max_age(time::Duration::seconds(SESSION_TTL_SECS))
        .build()
}

/// Cookie já expirado, para o navegador descartar o atual.
pub fn removal_cookie(settings: &Settings) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .path("/")
        .same_site(settings.cookie_same_site)
        .secure(settings.production)
        .max_age(time::Duration::ZERO)
        .build()
}

pub fn session_id_from(jar: &CookieJar) -> Option<Uuid> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

async fn authenticate(app_state: &AppState, jar: &CookieJar) -> Result<SessionContext, AppError> {
    let session_id = session_id_from(jar).ok_or(AppError::Unauthenticated)?;
    app_state.auth_service.validate_session(session_id).await
}

// O middleware das rotas autenticadas
pub async fn session_guard(
    State(app_state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&app_state, &jar).await {
        Ok(ctx) => {
            let cookie = session_cookie(ctx.session_id, &app_state.settings);
            // Insere o contexto nos "extensions" da requisição
            request.extensions_mut().insert(ctx);
            let response = next.run(request).await;
            (jar.add(cookie), response).into_response()
        }
        Err(e) => {
            let removal = removal_cookie(&app_state.settings);
            (jar.add(removal), e).into_response()
        }
    }
}

fn wants_html(request: &Request) -> bool {
    request.method() == Method::GET
        && request
            .headers()
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|accept| accept.contains("text/html"))
}

// Anexos: o navegador sem sessão vai para o login em vez de receber JSON
pub async fn uploads_guard(
    State(app_state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&app_state, &jar).await {
        Ok(ctx) => {
            let cookie = session_cookie(ctx.session_id, &app_state.settings);
            request.extensions_mut().insert(ctx);
            let response = next.run(request).await;
            (jar.add(cookie), response).into_response()
        }
        Err(_) if wants_html(&request) => {
            (StatusCode::FOUND, [(header::LOCATION, LOGIN_PAGE)]).into_response()
        }
        Err(e) => e.into_response(),
    }
}

// Extrator para obter o contexto da sessão diretamente nos handlers
impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .ok_or(AppError::Unauthenticated)
    }
}
