// src/db/session_repo.rs

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::auth::SessionUser};

// Sessões do lado do servidor. O cookie só carrega o id.
#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: i64, ttl: Duration) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(user_id)
            .bind(Utc::now() + ttl)
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    /// Renova a validade e devolve o usuário atual da sessão, numa única ida ao banco.
    /// Sessão inexistente ou vencida retorna `None`.
    pub async fn touch(&self, id: Uuid, ttl: Duration) -> Result<Option<SessionUser>, AppError> {
        let row = sqlx::query_as::<_, SessionUser>(
            r#"
            UPDATE sessions s
            SET expires_at = $2
            FROM users u
            LEFT JOIN roles r ON r.id = u.role_id
            WHERE s.id = $1
              AND s.expires_at > NOW()
              AND u.id = s.user_id
            RETURNING s.id AS session_id, u.id AS user_id, u.full_name,
                      u.role_id, r.name AS role_name, u.active
            "#,
        )
        .bind(id)
        .bind(Utc::now() + ttl)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
