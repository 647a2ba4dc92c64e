// src/handlers/tickets.rs

use axum::{
    extract::{
        multipart::{Field, MultipartError},
        Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::ticket::{
        IntakeForm, SubmitResponse, TicketDetail, TicketListQuery, TicketPage, UploadedFile,
    },
    services::auth::SessionContext,
};

/// Corpo acima do limite vira o mesmo erro do anexo grande demais.
pub(crate) fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::FileTooLarge;
    }
    AppError::Multipart(e.body_text())
}

/// Lê um campo de arquivo do multipart inteiro para a memória.
pub(crate) async fn read_file(field: Field<'_>) -> Result<Option<UploadedFile>, AppError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(str::to_string);
    let bytes = field.bytes().await.map_err(multipart_error)?;

    // input de arquivo enviado vazio
    if file_name.is_empty() && bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(UploadedFile {
        file_name,
        content_type,
        bytes: bytes.to_vec(),
    }))
}

pub(crate) async fn read_text(field: Field<'_>) -> Result<String, AppError> {
    field.text().await.map_err(multipart_error)
}

/// Id do caso vindo da URL ou de um campo de formulário.
pub(crate) fn parse_seq(raw: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::BadRequest("invalid_seq"))
}

async fn read_intake(mut multipart: Multipart) -> Result<(IntakeForm, Option<UploadedFile>), AppError> {
    let mut form = IntakeForm::default();
    let mut attachment = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "adjunto" {
            attachment = read_file(field).await?;
        } else {
            let value = read_text(field).await?;
            form.set_field(&name, value);
        }
    }
    Ok((form, attachment))
}

// POST /api/submit (público)
#[utoipa::path(
    post,
    path = "/api/submit",
    tag = "PQRS",
    request_body(content_type = "multipart/form-data", description = "Campos do formulário + `adjunto` opcional"),
    responses(
        (status = 201, description = "PQRS registrada", body = SubmitResponse),
        (status = 400, description = "Campos inválidos ou anexo recusado")
    )
)]
pub async fn submit(
    State(app_state): State<AppState>,
    locale: Locale,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (form, attachment) = read_intake(multipart)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let seq = app_state
        .ticket_service
        .submit(form, attachment)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            success: true,
            insert_id: seq,
        }),
    ))
}

// GET /api/respuestas
#[utoipa::path(
    get,
    path = "/api/respuestas",
    tag = "PQRS",
    params(TicketListQuery),
    responses(
        (status = 200, description = "Página de PQRS + total do filtro", body = TicketPage),
        (status = 400, description = "Data inválida")
    ),
    security(("session_cookie" = []))
)]
pub async fn list_tickets(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: SessionContext,
    Query(query): Query<TicketListQuery>,
) -> Result<Json<TicketPage>, ApiError> {
    let page = app_state
        .ticket_service
        .list(&ctx, &query)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(page))
}

// GET /api/respuesta/{seq}
#[utoipa::path(
    get,
    path = "/api/respuesta/{seq}",
    tag = "PQRS",
    params(("seq" = i64, Path, description = "Número do caso")),
    responses(
        (status = 200, description = "Caso completo", body = TicketDetail),
        (status = 403, description = "Responsável não atribuído ao caso"),
        (status = 404, description = "Não encontrado")
    ),
    security(("session_cookie" = []))
)]
pub async fn get_ticket(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: SessionContext,
    Path(seq): Path<String>,
) -> Result<Json<TicketDetail>, ApiError> {
    let seq = parse_seq(&seq).map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let detail = app_state
        .ticket_service
        .detail(&ctx, seq)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(detail))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_must_be_numeric() {
        assert_eq!(parse_seq(" 42 ").unwrap(), 42);
        assert!(matches!(parse_seq("SAC-42"), Err(AppError::BadRequest("invalid_seq"))));
    }
}
