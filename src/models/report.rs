// src/models/report.rs

use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

// Contagem por estado (cards do painel)
#[derive(Debug, Clone, Default, PartialEq, Serialize, FromRow, ToSchema)]
pub struct TicketStats {
    #[schema(example = 14)]
    pub pendientes: i64,
    #[schema(example = 9)]
    pub gestion: i64,
    #[schema(example = 40)]
    pub resueltas: i64,
    #[schema(example = 3)]
    pub vencido: i64,
    #[schema(example = 63)]
    pub total: i64,
}
