// src/services/report_service.rs

use crate::{
    common::error::AppError,
    db::{TicketRepository, UserRepository},
    models::{auth::Role, report::TicketStats, ticket::TicketListQuery},
    services::{auth::SessionContext, export, ticket_service::build_filter},
};

// Planilha pronta para download
pub struct ExportFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct ReportService {
    ticket_repo: TicketRepository,
    user_repo: UserRepository,
}

impl ReportService {
    pub fn new(ticket_repo: TicketRepository, user_repo: UserRepository) -> Self {
        Self { ticket_repo, user_repo }
    }

    /// Contagem por estado. O responsável só conta os próprios casos.
    pub async fn stats(&self, ctx: &SessionContext) -> Result<TicketStats, AppError> {
        let scope = (ctx.role == Role::Responsible).then_some(ctx.user_id);
        self.ticket_repo.stats(scope).await
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        self.ticket_repo.ping().await
    }

    /// Exporta o resultado filtrado completo. Só administrador e analista chegam aqui.
    pub async fn export(&self, ctx: &SessionContext, query: &TicketListQuery) -> Result<ExportFile, AppError> {
        let filter = build_filter(query, ctx)?;
        let rows = self.ticket_repo.export_rows(&filter).await?;
        let names = self.user_repo.names().await?;
        let count = rows.len();

        let bytes = tokio::task::spawn_blocking(move || export::build_workbook(&rows, &names))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task da planilha: {}", e))??;

        tracing::info!(user_id = ctx.user_id, rows = count, "Planilha exportada");

        Ok(ExportFile {
            file_name: export::file_name(chrono::Local::now().date_naive()),
            bytes,
        })
    }
}
