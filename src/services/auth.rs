// src/services/auth.rs

use bcrypt::{hash, verify};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::BootstrapAdmin,
    db::{user_repo::NewUser, SessionRepository, UserRepository},
    models::auth::{Role, SessionUser},
};

// Contexto da requisição autenticada. Vai para as extensões da requisição.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub user_id: i64,
    pub role: Role,
    pub role_name: String,
    pub display_name: String,
}

pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password_clone = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password_clone = password.to_owned();
    let password_hash_clone = password_hash.to_owned();

    // Executa a verificação em um thread separado
    let is_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
    Ok(is_valid)
}

/// Converte a linha da sessão em contexto. Usuário inativo ou sem papel válido é recusado.
pub fn session_context(row: SessionUser) -> Result<SessionContext, AppError> {
    if !row.active {
        return Err(AppError::InactiveUser);
    }
    let role = row
        .role_id
        .and_then(|id| Role::from_id(id.into()))
        .ok_or(AppError::RoleMissing)?;

    Ok(SessionContext {
        session_id: row.session_id,
        user_id: row.user_id,
        role,
        role_name: row.role_name.unwrap_or_default(),
        display_name: row.full_name,
    })
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    session_repo: SessionRepository,
    session_ttl: chrono::Duration,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, session_repo: SessionRepository, session_ttl: chrono::Duration) -> Self {
        Self {
            user_repo,
            session_repo,
            session_ttl,
        }
    }

    /// Valida as credenciais e abre uma sessão nova. A sessão anterior (se houver) é destruída.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        previous_session: Option<Uuid>,
    ) -> Result<SessionContext, AppError> {
        let candidate = self
            .user_repo
            .find_login_candidate(username.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !candidate.active {
            return Err(AppError::InactiveUser);
        }
        if !verify_password(password, &candidate.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }
        let role = candidate
            .role_id
            .and_then(|id| Role::from_id(id.into()))
            .ok_or(AppError::RoleMissing)?;

        if let Some(previous) = previous_session {
            self.session_repo.delete(previous).await?;
        }
        let session_id = self.session_repo.create(candidate.id, self.session_ttl).await?;

        tracing::info!(user_id = candidate.id, role = role.id(), "Login efetuado");

        Ok(SessionContext {
            session_id,
            user_id: candidate.id,
            role,
            role_name: candidate.role_name.unwrap_or_default(),
            display_name: candidate.full_name,
        })
    }

    pub async fn logout(&self, session_id: Uuid) -> Result<(), AppError> {
        self.session_repo.delete(session_id).await
    }

    /// Renova a sessão e relê o usuário. Sessões de usuários inativos ou sem papel são destruídas.
    pub async fn validate_session(&self, session_id: Uuid) -> Result<SessionContext, AppError> {
        let row = self
            .session_repo
            .touch(session_id, self.session_ttl)
            .await?
            .ok_or(AppError::Unauthenticated)?;

        match session_context(row) {
            Ok(ctx) => Ok(ctx),
            Err(e) => {
                self.session_repo.delete(session_id).await?;
                Err(e)
            }
        }
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64, AppError> {
        self.session_repo.purge_expired().await
    }

    /// Cria o administrador inicial quando a tabela de usuários está vazia.
    pub async fn ensure_bootstrap_admin(&self, admin: &BootstrapAdmin) -> Result<bool, AppError> {
        if self.user_repo.count().await? > 0 {
            return Ok(false);
        }
        let password_hash = hash_password(&admin.password).await?;
        let pool = self.user_repo.pool();
        self.user_repo
            .create_user(
                pool,
                &NewUser {
                    username: &admin.username,
                    password_hash: &password_hash,
                    full_name: "Administrador",
                    email: "",
                    role_id: Role::Admin.id(),
                    site: "",
                },
            )
            .await?;
        tracing::info!(username = %admin.username, "✅ Administrador inicial criado");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(active: bool, role_id: Option<i32>) -> SessionUser {
        SessionUser {
            session_id: Uuid::new_v4(),
            user_id: 4,
            full_name: "Marta".into(),
            role_id,
            role_name: Some("analista".into()),
            active,
        }
    }

    #[test]
    fn builds_context_from_active_user() {
        let ctx = session_context(row(true, Some(2))).unwrap();
        assert_eq!(ctx.role, Role::Analyst);
        assert_eq!(ctx.display_name, "Marta");
        assert_eq!(ctx.role_name, "analista");
    }

    #[test]
    fn rejects_inactive_or_roleless_users() {
        assert!(matches!(session_context(row(false, Some(2))), Err(AppError::InactiveUser)));
        assert!(matches!(session_context(row(true, None)), Err(AppError::RoleMissing)));
        assert!(matches!(session_context(row(true, Some(9))), Err(AppError::RoleMissing)));
    }

    #[tokio::test]
    async fn hashes_and_verifies_on_blocking_pool() {
        let hashed = hash_password("secreto123").await.unwrap();
        assert!(verify_password("secreto123", &hashed).await.unwrap());
        assert!(!verify_password("otra", &hashed).await.unwrap());
    }
}
