// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::auth::Role,
    services::auth::SessionContext,
};

/// Conjunto de papéis aceitos por uma rota
pub trait RoleSet: Send + Sync + 'static {
    fn roles() -> &'static [Role];

    fn allows(role: Role) -> bool {
        Self::roles().contains(&role)
    }
}

/// O extrator (guardião). Exige que a sessão já tenha passado pelo `session_guard`.
pub struct RequireRole<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleSet,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_header(
            parts
                .headers
                .get(header::ACCEPT_LANGUAGE)
                .and_then(|v| v.to_str().ok()),
        );

        let ctx = parts
            .extensions
            .get::<SessionContext>()
            .ok_or_else(|| AppError::Unauthenticated.to_api_error(&locale, &app_state.i18n_store))?;

        if !T::allows(ctx.role) {
            tracing::warn!(user_id = ctx.user_id, role = ctx.role.id(), "Papel sem acesso à rota");
            return Err(AppError::Forbidden("forbidden").to_api_error(&locale, &app_state.i18n_store));
        }

        Ok(RequireRole(PhantomData))
    }
}

// ---
// CONJUNTOS DE PAPÉIS
// ---

/// Administrador e analista: usuários, exportação, mensagem ao solicitante.
pub struct StaffManagers;
impl RoleSet for StaffManagers {
    fn roles() -> &'static [Role] {
        &[Role::Admin, Role::Analyst]
    }
}

/// Administrador, analista e auditor.
pub struct Supervisors;
impl RoleSet for Supervisors {
    fn roles() -> &'static [Role] {
        &[Role::Admin, Role::Analyst, Role::Auditor]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_sets() {
        assert!(StaffManagers::allows(Role::Analyst));
        assert!(!StaffManagers::allows(Role::Auditor));
        assert!(!StaffManagers::allows(Role::Responsible));
        assert!(Supervisors::allows(Role::Auditor));
        assert!(!Supervisors::allows(Role::Responsible));
    }
}
