// src/handlers/uploads.rs

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    services::{
        auth::SessionContext,
        upload_service::{preview_content_type, ServedFile},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Attachment,
    Inline,
}

fn percent_encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~".contains(&byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// `Content-Disposition` com nome ASCII de reserva e o nome original em `filename*`.
pub fn content_disposition(disposition: Disposition, name: &str) -> String {
    let kind = match disposition {
        Disposition::Attachment => "attachment",
        Disposition::Inline => "inline",
    };
    let fallback: String = name
        .chars()
        .map(|c| if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' { c } else { '_' })
        .collect();
    format!(
        "{kind}; filename=\"{fallback}\"; filename*=UTF-8''{}",
        percent_encode(name)
    )
}

async fn stream_file(file: ServedFile, disposition: Disposition) -> Result<Response, AppError> {
    let handle = tokio::fs::File::open(&file.path).await?;
    let length = handle.metadata().await?.len();
    let body = Body::from_stream(ReaderStream::new(handle));

    Ok((
        [
            (header::CONTENT_TYPE, preview_content_type(&file.display_name).to_string()),
            (header::CONTENT_LENGTH, length.to_string()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(disposition, &file.display_name),
            ),
            (header::CACHE_CONTROL, "private, no-store".to_string()),
        ],
        body,
    )
        .into_response())
}

async fn serve(
    app_state: &AppState,
    ctx: &SessionContext,
    filename: &str,
    disposition: Disposition,
) -> Result<Response, AppError> {
    let file = app_state.upload_service.locate(filename, ctx).await?;
    tracing::info!(user_id = ctx.user_id, file = %file.display_name, "Anexo servido");
    stream_file(file, disposition).await
}

// GET /uploads/{filename}
#[utoipa::path(
    get,
    path = "/uploads/{filename}",
    tag = "Anexos",
    params(("filename" = String, Path, description = "Nome gravado ou original do anexo")),
    responses(
        (status = 200, description = "Arquivo para download"),
        (status = 302, description = "Sem sessão (navegador): redireciona ao login"),
        (status = 403, description = "Responsável não atribuído ao caso"),
        (status = 404, description = "Não encontrado")
    ),
    security(("session_cookie" = []))
)]
pub async fn download(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: SessionContext,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    serve(&app_state, &ctx, &filename, Disposition::Attachment)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))
}

// GET /uploads/preview/{filename}
#[utoipa::path(
    get,
    path = "/uploads/preview/{filename}",
    tag = "Anexos",
    params(("filename" = String, Path, description = "Nome gravado ou original do anexo")),
    responses(
        (status = 200, description = "Arquivo para visualização no navegador"),
        (status = 403, description = "Responsável não atribuído ao caso"),
        (status = 404, description = "Não encontrado")
    ),
    security(("session_cookie" = []))
)]
pub async fn preview(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: SessionContext,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    serve(&app_state, &ctx, &filename, Disposition::Inline)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))
}
