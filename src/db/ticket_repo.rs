// src/db/ticket_repo.rs

use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    common::error::AppError,
    models::{
        auth::Contact,
        report::TicketStats,
        ticket::{ClassifyPayload, IntakeForm, ResponsibleAnswer, SlaSnapshot, Ticket, TicketDetail, TicketSummary},
    },
    services::workflow::TicketStatus,
};

// Filtro por estado: um dos três conhecidos ou o valor literal recebido
#[derive(Debug, Clone, PartialEq)]
pub enum StatusFilter {
    Known(TicketStatus),
    Literal(String),
}

// Filtros da listagem e da exportação
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketFilter {
    pub status: Option<StatusFilter>,
    pub document_number: Option<String>,
    pub email: Option<String>,
    pub submitted_from: Option<NaiveDate>,
    pub submitted_to: Option<NaiveDate>,
    /// Responsável: só enxerga os próprios casos.
    pub responsible_scope: Option<i64>,
}

const PENDING_SQL: &str = "(t.status IS NULL OR LOWER(t.status) IN ('', 'pendiente'))";
const IN_PROGRESS_SQL: &str = "LOWER(t.status) IN ('en gestion', 'en gestión')";
const RESOLVED_SQL: &str = "LOWER(t.status) = 'resuelta'";

/// Acrescenta o WHERE do filtro. Contagem e página usam a mesma função.
pub fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &'a TicketFilter) {
    let mut first = true;
    let mut and = |b: &mut QueryBuilder<'a, Postgres>| {
        b.push(if first { " WHERE " } else { " AND " });
        first = false;
    };

    if let Some(status) = &filter.status {
        and(builder);
        match status {
            StatusFilter::Known(TicketStatus::Pending) => builder.push(PENDING_SQL),
            StatusFilter::Known(TicketStatus::InProgress) => builder.push(IN_PROGRESS_SQL),
            StatusFilter::Known(TicketStatus::Resolved) => builder.push(RESOLVED_SQL),
            StatusFilter::Literal(raw) => builder.push("t.status = ").push_bind(raw.as_str()),
        };
    }
    if let Some(responsible) = filter.responsible_scope {
        and(builder);
        builder.push("t.responsible_id = ").push_bind(responsible);
    }
    if let Some(document) = &filter.document_number {
        and(builder);
        builder
            .push("t.document_number LIKE ")
            .push_bind(format!("%{document}%"));
    }
    if let Some(email) = &filter.email {
        and(builder);
        builder.push("t.email LIKE ").push_bind(format!("%{email}%"));
    }
    if let Some(from) = filter.submitted_from {
        and(builder);
        builder.push("t.submitted_at >= ").push_bind(from);
    }
    if let Some(to) = filter.submitted_to {
        and(builder);
        // dia final inclusive
        match to.succ_opt() {
            Some(next) => builder.push("t.submitted_at < ").push_bind(next),
            None => builder.push("t.submitted_at <= ").push_bind(to),
        };
    }
}

#[derive(Clone)]
pub struct TicketRepository {
    pool: PgPool,
}

impl TicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        form: &IntakeForm,
        attachment_name: Option<&str>,
        attachment_path: Option<&str>,
    ) -> Result<i64, AppError> {
        let seq: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO tickets (
                requester_type, document_type, document_number, full_name,
                sex, origin, department, municipality,
                address, phone, email, description,
                attachment_name, attachment_path
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING seq
            "#,
        )
        .bind(&form.requester_type)
        .bind(&form.document_type)
        .bind(&form.document_number)
        .bind(&form.full_name)
        .bind(&form.sex)
        .bind(&form.origin)
        .bind(&form.department)
        .bind(&form.municipality)
        .bind(&form.address)
        .bind(&form.phone)
        .bind(&form.email)
        .bind(&form.description)
        .bind(attachment_name)
        .bind(attachment_path)
        .fetch_one(&self.pool)
        .await?;
        Ok(seq)
    }

    pub async fn find(&self, seq: i64) -> Result<Option<Ticket>, AppError> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE seq = $1")
            .bind(seq)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ticket)
    }

    pub async fn find_detail(&self, seq: i64) -> Result<Option<TicketDetail>, AppError> {
        let detail = sqlx::query_as::<_, TicketDetail>(
            r#"
            SELECT t.*, u.full_name AS enviado_por_nombre, u.email AS enviado_por_correo
            FROM tickets t
            LEFT JOIN users u ON u.id = t.patient_message_sender_id
            WHERE t.seq = $1
            "#,
        )
        .bind(seq)
        .fetch_optional(&self.pool)
        .await?;
        Ok(detail)
    }

    pub async fn count(&self, filter: &TicketFilter) -> Result<i64, AppError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tickets t");
        push_filters(&mut builder, filter);
        let total: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(total)
    }

    pub async fn list(
        &self,
        filter: &TicketFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TicketSummary>, AppError> {
        let mut builder = QueryBuilder::<Postgres>::new(
            r#"
            SELECT t.seq, t.requester_type, t.document_type, t.document_number, t.full_name,
                   t.email, t.description, t.submitted_at, t.closed_on, t.due_date,
                   t.responded_on, t.status, t.observations, t.responsible_id
            FROM tickets t"#,
        );
        push_filters(&mut builder, filter);
        builder
            .push(" ORDER BY t.submitted_at ASC, t.seq ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = builder
            .build_query_as::<TicketSummary>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn export_rows(&self, filter: &TicketFilter) -> Result<Vec<TicketDetail>, AppError> {
        let mut builder = QueryBuilder::<Postgres>::new(
            r#"
            SELECT t.*, u.full_name AS enviado_por_nombre, u.email AS enviado_por_correo
            FROM tickets t
            LEFT JOIN users u ON u.id = t.patient_message_sender_id"#,
        );
        push_filters(&mut builder, filter);
        builder.push(" ORDER BY t.submitted_at ASC, t.seq ASC");

        let rows = builder
            .build_query_as::<TicketDetail>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // =========================================================================
    //  TIPIFICAÇÃO
    // =========================================================================

    /// Atualização completa. `closed_on` já vem decidido (nulo na reabertura).
    pub async fn update_full(
        &self,
        seq: i64,
        payload: &ClassifyPayload,
        status: TicketStatus,
        closed_on: Option<NaiveDate>,
        sla: &SlaSnapshot,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE tickets SET
                channel = $1, health_plan = $2, analyst_id = $3, handling_area = $4,
                responsible_id = $5, requirement_type = $6, service_type = $7, subtype = $8,
                contact_medium = $9, request_requirement = $10, attributable = $11, rationale = $12,
                due_date = $13, closed_on = $14, status = $15, observations = $16,
                area_response = $17, responded_on = $18, reassignment_requested = $19,
                reassignment_response = $20, reassignment_responded_on = $21,
                overdue = $22, sla_indicator = $23, real_elapsed_days = $24,
                operational_elapsed_days = $25
            WHERE seq = $26
            "#,
        )
        .bind(&payload.channel)
        .bind(&payload.health_plan)
        .bind(payload.analyst_id)
        .bind(&payload.handling_area)
        .bind(payload.responsible_id)
        .bind(&payload.requirement_type)
        .bind(&payload.service_type)
        .bind(&payload.subtype)
        .bind(&payload.contact_medium)
        .bind(&payload.request_requirement)
        .bind(&payload.attributable)
        .bind(&payload.rationale)
        .bind(payload.due_date)
        .bind(closed_on)
        .bind(status.label())
        .bind(&payload.observations)
        .bind(&payload.area_response)
        .bind(payload.responded_on)
        .bind(&payload.reassignment_requested)
        .bind(&payload.reassignment_response)
        .bind(payload.reassignment_responded_on)
        .bind(&sla.overdue)
        .bind(&sla.sla_indicator)
        .bind(sla.real_elapsed_days)
        .bind(sla.operational_elapsed_days)
        .bind(seq)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_status(&self, seq: i64, status: TicketStatus) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE tickets SET status = $1 WHERE seq = $2")
            .bind(status.label())
            .bind(seq)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Só grava se o caso continua atribuído a `responsible_id`.
    pub async fn update_responsible_answer(
        &self,
        seq: i64,
        responsible_id: i64,
        answer: &ResponsibleAnswer,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE tickets SET
                area_response = COALESCE($1, area_response),
                reassignment_response = COALESCE($2, reassignment_response),
                responded_on = COALESCE($3, responded_on),
                reassignment_responded_on = COALESCE($4, reassignment_responded_on)
            WHERE seq = $5 AND responsible_id = $6
            "#,
        )
        .bind(&answer.area_response)
        .bind(&answer.reassignment_response)
        .bind(answer.responded_on)
        .bind(answer.reassignment_responded_on)
        .bind(seq)
        .bind(responsible_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  MENSAGEM AO SOLICITANTE
    // =========================================================================

    pub async fn find_requester(&self, seq: i64) -> Result<Option<Contact>, AppError> {
        let contact = sqlx::query_as::<_, Contact>(
            "SELECT full_name, email FROM tickets WHERE seq = $1 AND email <> ''",
        )
        .bind(seq)
        .fetch_optional(&self.pool)
        .await?;
        Ok(contact)
    }

    pub async fn save_patient_message(&self, seq: i64, message: &str, sender_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE tickets
            SET patient_message = $1, patient_message_sent_at = NOW(), patient_message_sender_id = $2
            WHERE seq = $3
            "#,
        )
        .bind(message)
        .bind(sender_id)
        .bind(seq)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  ANEXOS E ESTATÍSTICAS
    // =========================================================================

    /// Dono do anexo: `Some(responsável)` quando algum caso referencia o arquivo,
    /// pelo caminho exato ou por `/uploads/<timestamp>-<nome>`.
    pub async fn find_attachment_owner(
        &self,
        exact_paths: &[String],
        like_patterns: &[String],
    ) -> Result<Option<Option<i64>>, AppError> {
        let owner: Option<Option<i64>> = sqlx::query_scalar(
            r#"
            SELECT responsible_id FROM tickets
            WHERE attachment_path = ANY($1) OR attachment_path LIKE ANY($2)
            ORDER BY seq
            LIMIT 1
            "#,
        )
        .bind(exact_paths)
        .bind(like_patterns)
        .fetch_optional(&self.pool)
        .await?;
        Ok(owner)
    }

    pub async fn stats(&self, responsible_scope: Option<i64>) -> Result<TicketStats, AppError> {
        let stats = sqlx::query_as::<_, TicketStats>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE t.status IS NULL OR LOWER(t.status) IN ('', 'pendiente')) AS pendientes,
                COUNT(*) FILTER (WHERE LOWER(t.status) IN ('en gestion', 'en gestión')) AS gestion,
                COUNT(*) FILTER (WHERE LOWER(t.status) = 'resuelta') AS resueltas,
                COUNT(*) FILTER (WHERE t.due_date < CURRENT_DATE AND t.responded_on IS NULL) AS vencido,
                COUNT(*) AS total
            FROM tickets t
            WHERE ($1::BIGINT IS NULL OR t.responsible_id = $1)
            "#,
        )
        .bind(responsible_scope)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
