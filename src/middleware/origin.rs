// src/middleware/origin.rs

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::{common::error::AppError, config::AppState};

// Requisições com Origin fora da lista são barradas antes de chegar aos handlers.
// Sem Origin (curl, navegação direta) passam.
pub async fn origin_guard(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok());

    if let Some(origin) = origin {
        if !app_state.settings.origin_allowed(origin) {
            tracing::warn!(origin, path = %request.uri().path(), "Origem bloqueada");
            return Err(AppError::OriginNotAllowed);
        }
    }

    Ok(next.run(request).await)
}
