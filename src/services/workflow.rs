// src/services/workflow.rs
//
// Máquina de estados da PQRS e regras de permissão por papel.
// Tudo aqui é puro: nada de banco, nada de e-mail.

use chrono::NaiveDate;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::{
    common::error::AppError,
    models::{
        auth::Role,
        ticket::{ClassifyPayload, Ticket},
    },
    services::notifier::{NotificationEvent, NotificationKind},
};

/// minúsculas, sem acentos, espaços colapsados
pub fn normalize_status(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStatus {
    Pending,
    InProgress,
    Resolved,
}

impl TicketStatus {
    /// Valor guardado no banco. Nulo ou vazio é pendente.
    pub fn from_stored(raw: Option<&str>) -> Result<Self, AppError> {
        let Some(raw) = raw else {
            return Ok(TicketStatus::Pending);
        };
        match normalize_status(raw).as_str() {
            "" | "pendiente" => Ok(TicketStatus::Pending),
            "en gestion" => Ok(TicketStatus::InProgress),
            "resuelta" => Ok(TicketStatus::Resolved),
            _ => Err(AppError::UnknownStatus(raw.to_string())),
        }
    }

    /// Rótulo canônico gravado nas atualizações.
    pub fn label(self) -> &'static str {
        match self {
            TicketStatus::Pending => "Pendiente",
            TicketStatus::InProgress => "En gestión",
            TicketStatus::Resolved => "Resuelta",
        }
    }
}

// O que a atualização pode fazer depois de aprovada
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePlan {
    /// Resolvida continua resolvida: só a coluna de estado.
    StatusOnly,
    /// Responsável registrando os quatro campos de resposta.
    ResponsibleAnswer,
    /// Resolvida voltando atrás: atualização completa e data de fechamento apagada.
    Reopen,
    /// Atualização completa com a data de fechamento recebida.
    Full,
}

impl UpdatePlan {
    /// Data de fechamento gravada. Reabrir sempre apaga, seja qual for o valor enviado.
    pub fn closure_date(self, supplied: Option<NaiveDate>) -> Option<NaiveDate> {
        match self {
            UpdatePlan::Reopen => None,
            _ => supplied,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    ResolvedLocked,
    NotAssigned,
    RestrictedFields,
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::ResolvedLocked => AppError::Forbidden("resolved_locked"),
            Denial::NotAssigned => AppError::Forbidden("forbidden_ticket_classify"),
            Denial::RestrictedFields => AppError::Forbidden("responsible_fields_only"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UpdateContext {
    pub actor_role: Role,
    pub actor_id: i64,
    pub assigned_responsible: Option<i64>,
    pub previous: TicketStatus,
    pub requested: TicketStatus,
    /// O pedido altera algo além dos quatro campos de resposta.
    pub touches_restricted_fields: bool,
}

pub fn decide_update(ctx: &UpdateContext) -> Result<UpdatePlan, Denial> {
    let was_resolved = ctx.previous == TicketStatus::Resolved;

    if was_resolved && ctx.requested == TicketStatus::Resolved {
        return match ctx.actor_role {
            Role::Admin | Role::Analyst | Role::Auditor => Ok(UpdatePlan::StatusOnly),
            Role::Responsible => Err(Denial::ResolvedLocked),
        };
    }

    if ctx.actor_role == Role::Responsible {
        if ctx.assigned_responsible != Some(ctx.actor_id) {
            return Err(Denial::NotAssigned);
        }
        if ctx.touches_restricted_fields {
            return Err(Denial::RestrictedFields);
        }
        return Ok(UpdatePlan::ResponsibleAnswer);
    }

    if was_resolved {
        Ok(UpdatePlan::Reopen)
    } else {
        Ok(UpdatePlan::Full)
    }
}

/// Estado pedido. Sem `estado` o responsável mantém o atual; os demais papéis caem em pendente.
pub fn requested_status(
    raw: Option<&str>,
    actor_role: Role,
    previous: TicketStatus,
) -> Result<TicketStatus, AppError> {
    match raw {
        Some(raw) => TicketStatus::from_stored(Some(raw)),
        None if actor_role == Role::Responsible => Ok(previous),
        None => Ok(TicketStatus::Pending),
    }
}

fn differs_text(incoming: &Option<String>, stored: &Option<String>) -> bool {
    match incoming {
        None => false,
        Some(value) => stored.as_deref().map(str::trim) != Some(value.trim()),
    }
}

fn differs<T: PartialEq>(incoming: &Option<T>, stored: &Option<T>) -> bool {
    incoming.is_some() && incoming != stored
}

/// Verdadeiro quando o pedido mexe em qualquer campo fora dos quatro de resposta.
/// Campos ausentes não contam; campos iguais ao valor gravado também não.
pub fn touches_restricted_fields(payload: &ClassifyPayload, ticket: &Ticket) -> bool {
    let status_changed = match payload.status.as_deref() {
        None => false,
        Some(raw) => {
            TicketStatus::from_stored(Some(raw)).ok()
                != TicketStatus::from_stored(ticket.status.as_deref()).ok()
        }
    };

    status_changed
        || differs_text(&payload.channel, &ticket.channel)
        || differs_text(&payload.health_plan, &ticket.health_plan)
        || differs(&payload.analyst_id, &ticket.analyst_id)
        || differs_text(&payload.handling_area, &ticket.handling_area)
        || differs(&payload.responsible_id, &ticket.responsible_id)
        || differs_text(&payload.requirement_type, &ticket.requirement_type)
        || differs_text(&payload.service_type, &ticket.service_type)
        || differs_text(&payload.subtype, &ticket.subtype)
        || differs_text(&payload.contact_medium, &ticket.contact_medium)
        || differs_text(&payload.request_requirement, &ticket.request_requirement)
        || differs_text(&payload.attributable, &ticket.attributable)
        || differs_text(&payload.rationale, &ticket.rationale)
        || differs(&payload.due_date, &ticket.due_date)
        || differs(&payload.closed_on, &ticket.closed_on)
        || differs_text(&payload.observations, &ticket.observations)
        || differs_text(&payload.reassignment_requested, &ticket.reassignment_requested)
}

/// Escolhe no máximo uma notificação, na ordem fixa:
/// reaberta, finalizada, de volta a "en gestión", reatribuição respondida,
/// reatribuição pedida, resposta à área, atribuída.
pub fn select_notification(
    plan: UpdatePlan,
    previous: TicketStatus,
    requested: TicketStatus,
    seq: i64,
    payload: &ClassifyPayload,
    stored_analyst: Option<i64>,
) -> Option<NotificationEvent> {
    use NotificationKind::*;

    let (kind, recipient) = match plan {
        UpdatePlan::StatusOnly => return None,
        UpdatePlan::ResponsibleAnswer => {
            let kind = if payload.reassignment_response.is_some() {
                ReassignmentAnswered
            } else {
                AreaResponded
            };
            (kind, stored_analyst)
        }
        UpdatePlan::Reopen | UpdatePlan::Full => {
            let was_resolved = previous == TicketStatus::Resolved;
            let is_resolved = requested == TicketStatus::Resolved;
            if was_resolved && !is_resolved {
                (Reopened, payload.responsible_id)
            } else if !was_resolved && is_resolved {
                (Finalized, payload.responsible_id)
            } else if was_resolved && requested == TicketStatus::InProgress {
                // sempre sombreado pela reabertura acima
                (BackInProgress, payload.responsible_id)
            } else if payload.reassignment_response.is_some() {
                (ReassignmentAnswered, payload.analyst_id)
            } else if payload.asks_reassignment() {
                (ReassignmentRequested, payload.responsible_id)
            } else if payload.area_response.is_some() {
                (AreaResponded, payload.analyst_id)
            } else {
                (Assigned, payload.responsible_id)
            }
        }
    };

    recipient.map(|recipient_id| NotificationEvent {
        kind,
        seq,
        recipient_id,
        due_date: payload.due_date,
        observations: payload.observations.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ctx(role: Role, previous: TicketStatus, requested: TicketStatus) -> UpdateContext {
        UpdateContext {
            actor_role: role,
            actor_id: 10,
            assigned_responsible: Some(10),
            previous,
            requested,
            touches_restricted_fields: false,
        }
    }

    fn ticket() -> Ticket {
        Ticket {
            seq: 1,
            requester_type: "Paciente".into(),
            document_type: "CC".into(),
            document_number: "123".into(),
            full_name: "ANA".into(),
            sex: "F".into(),
            origin: "WEB".into(),
            department: "Valle".into(),
            municipality: "Cali".into(),
            address: "CALLE 1".into(),
            phone: "300".into(),
            email: "ana@x.co".into(),
            description: "Queja".into(),
            attachment_name: None,
            attachment_path: None,
            submitted_at: Utc::now(),
            status: Some("En gestión".into()),
            observations: None,
            channel: Some("WEB".into()),
            health_plan: None,
            analyst_id: Some(2),
            handling_area: Some("Citas".into()),
            responsible_id: Some(10),
            requirement_type: None,
            service_type: None,
            subtype: None,
            contact_medium: None,
            request_requirement: None,
            attributable: None,
            rationale: None,
            due_date: NaiveDate::from_ymd_opt(2025, 6, 1),
            closed_on: None,
            sla_indicator: None,
            real_elapsed_days: None,
            operational_elapsed_days: None,
            overdue: None,
            area_response: None,
            responded_on: None,
            reassignment_requested: None,
            reassignment_response: None,
            reassignment_responded_on: None,
            patient_message: None,
            patient_message_sent_at: None,
            patient_message_sender_id: None,
        }
    }

    #[test]
    fn normalizes_case_accents_and_spaces() {
        assert_eq!(normalize_status("  En   GESTIÓN "), "en gestion");
        assert_eq!(normalize_status("Resuelta"), "resuelta");
        assert_eq!(normalize_status(""), "");
    }

    #[test]
    fn parses_closed_status_set() {
        assert_eq!(TicketStatus::from_stored(None).unwrap(), TicketStatus::Pending);
        assert_eq!(TicketStatus::from_stored(Some("")).unwrap(), TicketStatus::Pending);
        assert_eq!(
            TicketStatus::from_stored(Some("en gestion")).unwrap(),
            TicketStatus::InProgress
        );
        assert_eq!(
            TicketStatus::from_stored(Some("RESUELTA")).unwrap(),
            TicketStatus::Resolved
        );
        assert!(TicketStatus::from_stored(Some("archivada")).is_err());
    }

    #[test]
    fn resolved_stays_resolved_only_for_supervising_roles() {
        use TicketStatus::Resolved;
        for role in [Role::Admin, Role::Analyst, Role::Auditor] {
            assert_eq!(
                decide_update(&ctx(role, Resolved, Resolved)),
                Ok(UpdatePlan::StatusOnly)
            );
        }
        assert_eq!(
            decide_update(&ctx(Role::Responsible, Resolved, Resolved)),
            Err(Denial::ResolvedLocked)
        );
    }

    #[test]
    fn reopening_uses_reopen_plan() {
        let plan = decide_update(&ctx(Role::Analyst, TicketStatus::Resolved, TicketStatus::InProgress));
        assert_eq!(plan, Ok(UpdatePlan::Reopen));
        let plan = decide_update(&ctx(Role::Auditor, TicketStatus::Pending, TicketStatus::Resolved));
        assert_eq!(plan, Ok(UpdatePlan::Full));
    }

    #[test]
    fn reopening_always_clears_closure_date() {
        let supplied = NaiveDate::from_ymd_opt(2025, 5, 30);
        assert_eq!(UpdatePlan::Reopen.closure_date(supplied), None);
        assert_eq!(UpdatePlan::Reopen.closure_date(None), None);
        assert_eq!(UpdatePlan::Full.closure_date(supplied), supplied);
    }

    #[test]
    fn responsible_party_is_limited_to_own_ticket_and_answer_fields() {
        let mut c = ctx(Role::Responsible, TicketStatus::InProgress, TicketStatus::InProgress);
        assert_eq!(decide_update(&c), Ok(UpdatePlan::ResponsibleAnswer));

        c.assigned_responsible = Some(99);
        assert_eq!(decide_update(&c), Err(Denial::NotAssigned));

        c.assigned_responsible = None;
        assert_eq!(decide_update(&c), Err(Denial::NotAssigned));

        c.assigned_responsible = Some(10);
        c.touches_restricted_fields = true;
        assert_eq!(decide_update(&c), Err(Denial::RestrictedFields));
    }

    #[test]
    fn missing_status_keeps_current_for_responsible_only() {
        assert_eq!(
            requested_status(None, Role::Responsible, TicketStatus::InProgress).unwrap(),
            TicketStatus::InProgress
        );
        assert_eq!(
            requested_status(None, Role::Analyst, TicketStatus::InProgress).unwrap(),
            TicketStatus::Pending
        );
    }

    #[test]
    fn detects_restricted_changes() {
        let stored = ticket();
        let mut payload = ClassifyPayload {
            seq: Some(1),
            area_response: Some("Respuesta".into()),
            responded_on: NaiveDate::from_ymd_opt(2025, 5, 20),
            channel: Some(" WEB ".into()),
            status: Some("en gestion".into()),
            responsible_id: Some(10),
            ..Default::default()
        };
        assert!(!touches_restricted_fields(&payload, &stored));

        payload.responsible_id = Some(11);
        assert!(touches_restricted_fields(&payload, &stored));

        payload.responsible_id = None;
        payload.status = Some("Resuelta".into());
        assert!(touches_restricted_fields(&payload, &stored));
    }

    #[test]
    fn notification_precedence_is_fixed() {
        use TicketStatus::*;
        let mut payload = ClassifyPayload {
            analyst_id: Some(2),
            responsible_id: Some(10),
            reassignment_response: Some("ok".into()),
            reassignment_requested: Some("SI".into()),
            area_response: Some("r".into()),
            ..Default::default()
        };

        let pick = |plan, prev, req, p: &ClassifyPayload| {
            select_notification(plan, prev, req, 7, p, Some(2)).map(|e| (e.kind, e.recipient_id))
        };

        assert_eq!(
            pick(UpdatePlan::Reopen, Resolved, Pending, &payload),
            Some((NotificationKind::Reopened, 10))
        );
        assert_eq!(
            pick(UpdatePlan::Full, InProgress, Resolved, &payload),
            Some((NotificationKind::Finalized, 10))
        );
        assert_eq!(
            pick(UpdatePlan::Reopen, Resolved, InProgress, &payload),
            Some((NotificationKind::Reopened, 10))
        );
        assert_eq!(
            pick(UpdatePlan::Full, InProgress, InProgress, &payload),
            Some((NotificationKind::ReassignmentAnswered, 2))
        );

        payload.reassignment_response = None;
        assert_eq!(
            pick(UpdatePlan::Full, InProgress, InProgress, &payload),
            Some((NotificationKind::ReassignmentRequested, 10))
        );

        payload.reassignment_requested = Some("NO".into());
        assert_eq!(
            pick(UpdatePlan::Full, InProgress, InProgress, &payload),
            Some((NotificationKind::AreaResponded, 2))
        );

        payload.area_response = None;
        assert_eq!(
            pick(UpdatePlan::Full, Pending, InProgress, &payload),
            Some((NotificationKind::Assigned, 10))
        );

        assert_eq!(pick(UpdatePlan::StatusOnly, Resolved, Resolved, &payload), None);
    }

    #[test]
    fn responsible_answer_notifies_stored_analyst() {
        let payload = ClassifyPayload {
            area_response: Some("listo".into()),
            ..Default::default()
        };
        let event = select_notification(
            UpdatePlan::ResponsibleAnswer,
            TicketStatus::InProgress,
            TicketStatus::InProgress,
            3,
            &payload,
            Some(2),
        )
        .unwrap();
        assert_eq!(event.kind, NotificationKind::AreaResponded);
        assert_eq!(event.recipient_id, 2);

        let none = select_notification(
            UpdatePlan::ResponsibleAnswer,
            TicketStatus::InProgress,
            TicketStatus::InProgress,
            3,
            &payload,
            None,
        );
        assert!(none.is_none());
    }
}
