// src/db/user_repo.rs

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::auth::{Contact, LoginCandidate, User, UserOption},
    services::notifier::RecipientDirectory,
};

// Dados de um novo usuário já com a senha em hash
pub struct NewUser<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub full_name: &'a str,
    pub email: &'a str,
    pub role_id: i32,
    pub site: &'a str,
}

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    // Busca o usuário do login junto com o nome do papel
    pub async fn find_login_candidate(&self, username: &str) -> Result<Option<LoginCandidate>, AppError> {
        let candidate = sqlx::query_as::<_, LoginCandidate>(
            r#"
            SELECT u.id, u.password_hash, u.full_name, u.active, u.role_id, r.name AS role_name
            FROM users u
            LEFT JOIN roles r ON r.id = u.role_id
            WHERE u.username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(candidate)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    // Cria um novo usuário no banco de dados.
    // Nome de usuário repetido vira erro de negócio, não 500.
    pub async fn create_user<'e, E>(&self, executor: E, new_user: &NewUser<'_>) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, password_hash, full_name, email, role_id, site)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(new_user.username)
        .bind(new_user.password_hash)
        .bind(new_user.full_name)
        .bind(new_user.email)
        .bind(new_user.role_id)
        .bind(new_user.site)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::UsernameTaken;
                }
            }
            e.into()
        })?;

        Ok(id)
    }

    /// Retorna `false` quando o id não existe.
    pub async fn update_profile(
        &self,
        id: i64,
        full_name: &str,
        email: &str,
        role_id: i32,
        site: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET full_name = $1, email = $2, role_id = $3, site = $4, updated_at = NOW()
            WHERE id = $5
            "#,
        )
        .bind(full_name)
        .bind(email)
        .bind(role_id)
        .bind(site)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_active(&self, id: i64, active: bool) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET active = $1, updated_at = NOW() WHERE id = $2")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // Usuário exato, e-mail exato ou parte do nome. Retorna o primeiro.
    pub async fn search(&self, q: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE username = $1 OR email = $1 OR full_name ILIKE '%' || $1 || '%'
            ORDER BY (username = $1) DESC, (email = $1) DESC, id ASC
            LIMIT 1
            "#,
        )
        .bind(q)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn list_by_role(&self, role_id: i32) -> Result<Vec<UserOption>, AppError> {
        let users = sqlx::query_as::<_, UserOption>(
            "SELECT id, username, full_name FROM users WHERE role_id = $1 ORDER BY full_name",
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    pub async fn find_contact(&self, id: i64) -> Result<Option<Contact>, AppError> {
        let contact = sqlx::query_as::<_, Contact>("SELECT full_name, email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(contact)
    }

    // id -> nome, para a exportação
    pub async fn names(&self) -> Result<HashMap<i64, String>, AppError> {
        let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, full_name FROM users")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().collect())
    }
}

#[async_trait]
impl RecipientDirectory for UserRepository {
    async fn lookup(&self, user_id: i64) -> Result<Option<Contact>, AppError> {
        self.find_contact(user_id).await
    }
}
