// src/handlers/messages.rs

use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    handlers::tickets::{multipart_error, parse_seq, read_file, read_text},
    middleware::{
        i18n::Locale,
        rbac::{RequireRole, StaffManagers},
    },
    models::{response::ActionResponse, ticket::PatientMessageForm},
    services::auth::SessionContext,
};

async fn read_message_form(mut multipart: Multipart) -> Result<PatientMessageForm, AppError> {
    let mut form = PatientMessageForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "seq" => {
                let raw = read_text(field).await?;
                if !raw.trim().is_empty() {
                    form.seq = Some(parse_seq(&raw)?);
                }
            }
            "mensaje" => form.message = Some(read_text(field).await?),
            "archivoAdjunto" => form.attachment = read_file(field).await?,
            _ => {}
        }
    }
    Ok(form)
}

// POST /api/enviar-paciente
#[utoipa::path(
    post,
    path = "/api/enviar-paciente",
    tag = "PQRS",
    request_body(content_type = "multipart/form-data", description = "`seq`, `mensaje` e `archivoAdjunto` opcional"),
    responses(
        (status = 200, description = "E-mail enviado ao solicitante", body = ActionResponse),
        (status = 400, description = "Falta seq ou mensagem"),
        (status = 404, description = "Solicitante sem e-mail"),
        (status = 500, description = "Falha no envio")
    ),
    security(("session_cookie" = []))
)]
pub async fn send_to_requester(
    State(app_state): State<AppState>,
    locale: Locale,
    ctx: SessionContext,
    _guard: RequireRole<StaffManagers>,
    multipart: Multipart,
) -> Result<Json<ActionResponse>, ApiError> {
    let form = read_message_form(multipart)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .ticket_service
        .send_patient_message(&ctx, form)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ActionResponse::ok(
        app_state.i18n_store.translate(&locale.0, "patient_mail_sent"),
    )))
}
