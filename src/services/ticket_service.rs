// src/services/ticket_service.rs

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use validator::Validate;

use crate::{
    common::{error::AppError, lenient::parse_date},
    config::Settings,
    db::{
        ticket_repo::{StatusFilter, TicketFilter},
        TicketRepository, UserRepository,
    },
    models::{
        auth::Role,
        ticket::{
            ClassifyPayload, IntakeForm, PatientMessageForm, ResponsibleAnswer, TicketDetail,
            TicketListQuery, TicketPage, UploadedFile,
        },
    },
    services::{
        auth::SessionContext,
        notifier::{
            templates::{self, RequesterLetter, SIGNATURE_CID},
            InlineImage, MailAttachment, Mailer, Notifier, OutgoingMail,
        },
        sla::{self, SlaInputs},
        upload_service::{self, UploadService},
        workflow::{self, normalize_status, TicketStatus, UpdateContext, UpdatePlan},
    },
};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 200;

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Traduz os parâmetros da listagem para o filtro do repositório.
/// O responsável sempre fica restrito aos próprios casos.
pub fn build_filter(query: &TicketListQuery, ctx: &SessionContext) -> Result<TicketFilter, AppError> {
    let status = non_blank(&query.estado).map(|raw| match normalize_status(&raw).as_str() {
        "pendiente" => StatusFilter::Known(TicketStatus::Pending),
        "en gestion" => StatusFilter::Known(TicketStatus::InProgress),
        "resuelta" => StatusFilter::Known(TicketStatus::Resolved),
        _ => StatusFilter::Literal(raw),
    });

    let date = |raw: &Option<String>| -> Result<Option<NaiveDate>, AppError> {
        match non_blank(raw) {
            None => Ok(None),
            Some(raw) => parse_date(&raw).map_err(|_| AppError::BadRequest("invalid_date")),
        }
    };

    Ok(TicketFilter {
        status,
        document_number: non_blank(&query.documeto_paciente),
        email: non_blank(&query.correo),
        submitted_from: date(&query.fecha_desde)?,
        submitted_to: date(&query.fecha_hasta)?,
        responsible_scope: (ctx.role == Role::Responsible).then_some(ctx.user_id),
    })
}

pub fn page_bounds(query: &TicketListQuery) -> (i64, i64) {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);
    (limit, offset)
}

/// O responsável só enxerga casos atribuídos a ele.
pub fn can_view(ctx: &SessionContext, responsible_id: Option<i64>) -> bool {
    ctx.role != Role::Responsible || responsible_id == Some(ctx.user_id)
}

// Resultado da tipificação: qual caminho foi aplicado
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifyOutcome {
    pub plan: UpdatePlan,
    pub notified: bool,
}

impl ClassifyOutcome {
    pub fn message_key(&self) -> &'static str {
        match self.plan {
            UpdatePlan::StatusOnly => "status_updated",
            UpdatePlan::ResponsibleAnswer => "responsible_answer_saved",
            UpdatePlan::Reopen | UpdatePlan::Full => "classification_saved",
        }
    }
}

#[derive(Clone)]
pub struct TicketService {
    ticket_repo: TicketRepository,
    user_repo: UserRepository,
    uploads: UploadService,
    notifier: Notifier,
    mailer: Arc<dyn Mailer>,
    settings: Arc<Settings>,
}

impl TicketService {
    pub fn new(
        ticket_repo: TicketRepository,
        user_repo: UserRepository,
        uploads: UploadService,
        notifier: Notifier,
        mailer: Arc<dyn Mailer>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            ticket_repo,
            user_repo,
            uploads,
            notifier,
            mailer,
            settings,
        }
    }

    // =========================================================================
    //  FORMULÁRIO PÚBLICO
    // =========================================================================

    pub async fn submit(&self, form: IntakeForm, attachment: Option<UploadedFile>) -> Result<i64, AppError> {
        form.validate()?;

        let stored = match &attachment {
            Some(file) => Some(self.uploads.store(file).await?),
            None => None,
        };

        let seq = self
            .ticket_repo
            .insert(
                &form,
                stored.as_ref().map(|s| s.original_name.as_str()),
                stored.as_ref().map(|s| s.public_path.as_str()),
            )
            .await?;

        tracing::info!(seq, with_attachment = stored.is_some(), "PQRS recebida");
        Ok(seq)
    }

    // =========================================================================
    //  CONSULTA
    // =========================================================================

    pub async fn list(&self, ctx: &SessionContext, query: &TicketListQuery) -> Result<TicketPage, AppError> {
        let filter = build_filter(query, ctx)?;
        let (limit, offset) = page_bounds(query);

        let total = self.ticket_repo.count(&filter).await?;
        let mut data = self.ticket_repo.list(&filter, limit, offset).await?;

        let today = today();
        for row in &mut data {
            row.vencido = sla::classify_overdue(row.due_date, row.responded_on, today).map(str::to_string);
        }

        Ok(TicketPage {
            success: true,
            total,
            data,
        })
    }

    pub async fn detail(&self, ctx: &SessionContext, seq: i64) -> Result<TicketDetail, AppError> {
        let detail = self
            .ticket_repo
            .find_detail(seq)
            .await?
            .ok_or(AppError::NotFound("not_found"))?;

        if !can_view(ctx, detail.ticket.responsible_id) {
            return Err(AppError::Forbidden("forbidden_ticket_view"));
        }
        Ok(detail)
    }

    // =========================================================================
    //  TIPIFICAÇÃO
    // =========================================================================

    pub async fn classify(&self, ctx: &SessionContext, payload: &ClassifyPayload) -> Result<ClassifyOutcome, AppError> {
        let seq = payload.seq.ok_or(AppError::BadRequest("missing_seq"))?;
        let ticket = self
            .ticket_repo
            .find(seq)
            .await?
            .ok_or(AppError::NotFound("not_found"))?;

        let previous = TicketStatus::from_stored(ticket.status.as_deref()).unwrap_or(TicketStatus::Pending);
        let requested = workflow::requested_status(payload.status.as_deref(), ctx.role, previous)?;

        let plan = workflow::decide_update(&UpdateContext {
            actor_role: ctx.role,
            actor_id: ctx.user_id,
            assigned_responsible: ticket.responsible_id,
            previous,
            requested,
            touches_restricted_fields: ctx.role == Role::Responsible
                && workflow::touches_restricted_fields(payload, &ticket),
        })?;

        let updated = match plan {
            UpdatePlan::StatusOnly => self.ticket_repo.update_status(seq, requested).await?,
            UpdatePlan::ResponsibleAnswer => {
                let answer = ResponsibleAnswer::from(payload);
                let saved = self
                    .ticket_repo
                    .update_responsible_answer(seq, ctx.user_id, &answer)
                    .await?;
                // reatribuído entre a leitura e a escrita
                if !saved {
                    return Err(AppError::Forbidden("forbidden_ticket_classify"));
                }
                saved
            }
            UpdatePlan::Reopen | UpdatePlan::Full => {
                let closed_on = plan.closure_date(payload.closed_on);
                let snapshot = sla::derive(
                    &SlaInputs {
                        submitted_on: ticket.submitted_at.with_timezone(&Local).date_naive(),
                        due_date: payload.due_date,
                        responded_on: payload.responded_on,
                        closed_on,
                    },
                    today(),
                );
                self.ticket_repo
                    .update_full(seq, payload, requested, closed_on, &snapshot)
                    .await?
            }
        };

        if !updated {
            return Err(AppError::NotFound("not_found"));
        }

        let event = workflow::select_notification(plan, previous, requested, seq, payload, ticket.analyst_id);
        let notified = event.is_some();
        if let Some(event) = event {
            self.notifier.emit(event);
        }

        tracing::info!(
            seq,
            user_id = ctx.user_id,
            plan = ?plan,
            from = previous.label(),
            to = requested.label(),
            notified,
            "Tipificação aplicada"
        );

        Ok(ClassifyOutcome { plan, notified })
    }

    // =========================================================================
    //  MENSAGEM AO SOLICITANTE
    // =========================================================================

    pub async fn send_patient_message(&self, ctx: &SessionContext, form: PatientMessageForm) -> Result<(), AppError> {
        let (Some(seq), Some(message)) = (form.seq, form.message.filter(|m| !m.trim().is_empty())) else {
            return Err(AppError::BadRequest("missing_message"));
        };
        if let Some(file) = &form.attachment {
            upload_service::validate(file)?;
        }

        let requester = self
            .ticket_repo
            .find_requester(seq)
            .await?
            .ok_or(AppError::NotFound("requester_not_found"))?;

        self.ticket_repo
            .save_patient_message(seq, &message, ctx.user_id)
            .await?;

        let sender = self.user_repo.find_contact(ctx.user_id).await?;
        let organization = self.settings.organization_name.as_str();
        let analyst_name = sender
            .as_ref()
            .map(|c| c.full_name.clone())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| ctx.display_name.clone());
        let analyst_email = sender
            .as_ref()
            .map(|c| c.email.clone())
            .filter(|e| !e.trim().is_empty())
            .or_else(|| self.settings.smtp.as_ref().map(|s| s.user.clone()))
            .unwrap_or_default();

        let signature = match tokio::fs::read(&self.settings.signature_image_path).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::debug!(error = %e, "Imagem de assinatura indisponível");
                None
            }
        };

        let letter = templates::render_requester_letter(&RequesterLetter {
            seq,
            requester_name: &requester.full_name,
            message: &message,
            analyst_name: &analyst_name,
            analyst_email: &analyst_email,
            organization,
            with_signature: signature.is_some(),
        });

        let attachments = form
            .attachment
            .map(|file| MailAttachment {
                content_type: file
                    .content_type
                    .clone()
                    .unwrap_or_else(|| "application/octet-stream".into()),
                file_name: upload_service::base_name(&file.file_name),
                bytes: file.bytes,
            })
            .into_iter()
            .collect();
        let inline_images = signature
            .map(|bytes| InlineImage {
                content_id: SIGNATURE_CID.into(),
                content_type: "image/jpeg".into(),
                bytes,
            })
            .into_iter()
            .collect();

        self.mailer
            .send(OutgoingMail {
                from_name: Some(format!("{analyst_name} - {organization}")),
                to: requester.email,
                subject: letter.subject,
                text: letter.text,
                html: Some(letter.html),
                attachments,
                inline_images,
            })
            .await?;

        tracing::info!(seq, user_id = ctx.user_id, "Mensagem enviada ao solicitante");
        Ok(())
    }
}
