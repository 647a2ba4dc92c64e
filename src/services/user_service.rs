// src/services/user_service.rs

use crate::{
    common::error::AppError,
    db::{user_repo::NewUser, UserRepository},
    models::auth::{CreateUserPayload, Role, UpdateUserPayload, User, UserOption},
    services::auth::hash_password,
};

fn known_role(role_id: Option<i64>) -> Result<Role, AppError> {
    role_id
        .and_then(Role::from_id)
        .ok_or(AppError::BadRequest("invalid_role"))
}

#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
}

impl UserService {
    pub fn new(user_repo: UserRepository) -> Self {
        Self { user_repo }
    }

    /// O payload já chega validado.
    pub async fn create(&self, payload: &CreateUserPayload) -> Result<i64, AppError> {
        let role = known_role(payload.role_id)?;
        let password_hash = hash_password(&payload.password).await?;

        let id = self
            .user_repo
            .create_user(
                self.user_repo.pool(),
                &NewUser {
                    username: payload.username.trim(),
                    password_hash: &password_hash,
                    full_name: payload.full_name.trim(),
                    email: payload.email.trim(),
                    role_id: role.id(),
                    site: payload.site.trim(),
                },
            )
            .await?;

        tracing::info!(user_id = id, role = role.id(), "Usuário criado");
        Ok(id)
    }

    pub async fn update(&self, id: i64, payload: &UpdateUserPayload) -> Result<(), AppError> {
        let role = known_role(payload.role_id)?;
        let updated = self
            .user_repo
            .update_profile(
                id,
                payload.full_name.trim(),
                payload.email.trim(),
                role.id(),
                payload.site.trim(),
            )
            .await?;

        if !updated {
            return Err(AppError::NotFound("user_not_found"));
        }
        Ok(())
    }

    /// Retorna o novo valor do flag.
    pub async fn set_active(&self, id: i64, active: Option<bool>) -> Result<bool, AppError> {
        let active = active.ok_or(AppError::BadRequest("missing_active"))?;
        if !self.user_repo.set_active(id, active).await? {
            return Err(AppError::NotFound("not_found"));
        }
        tracing::info!(user_id = id, active, "Status do usuário alterado");
        Ok(active)
    }

    pub async fn search(&self, q: Option<&str>) -> Result<User, AppError> {
        let q = q
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or(AppError::BadRequest("missing_query"))?;

        self.user_repo
            .search(q)
            .await?
            .ok_or(AppError::NotFound("not_found"))
    }

    pub async fn list_by_role(&self, role_id: i64) -> Result<Vec<UserOption>, AppError> {
        let role = known_role(Some(role_id))?;
        self.user_repo.list_by_role(role.id()).await
    }

    pub async fn profile(&self, user_id: i64) -> Result<User, AppError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound("not_found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_known_roles_are_accepted() {
        assert_eq!(known_role(Some(3)).unwrap(), Role::Responsible);
        assert!(matches!(known_role(Some(7)), Err(AppError::BadRequest("invalid_role"))));
        assert!(matches!(known_role(None), Err(AppError::BadRequest("invalid_role"))));
    }
}
