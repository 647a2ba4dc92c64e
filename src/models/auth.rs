// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::common::lenient;

// Papéis fixos (tabela `roles`). O id numérico é o que o painel conhece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Analyst,
    Responsible,
    Auditor,
}

impl Role {
    pub fn id(self) -> i32 {
        match self {
            Role::Admin => 1,
            Role::Analyst => 2,
            Role::Responsible => 3,
            Role::Auditor => 4,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Analyst),
            3 => Some(Role::Responsible),
            4 => Some(Role::Auditor),
            _ => None,
        }
    }
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct User {
    #[schema(example = 7)]
    pub id: i64,

    #[serde(rename = "usuario")]
    #[schema(example = "jperez")]
    pub username: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    pub password_hash: String,

    #[serde(rename = "nombre")]
    #[schema(example = "Juan Pérez")]
    pub full_name: String,

    #[serde(rename = "correo")]
    #[schema(example = "jperez@mtd.com.co")]
    pub email: String,

    #[serde(rename = "rol_id")]
    #[schema(example = 2)]
    pub role_id: Option<i32>,

    #[serde(rename = "sede")]
    #[schema(example = "Bogotá")]
    pub site: String,

    #[serde(rename = "activo")]
    pub active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Linha usada para validar a sessão: usuário + nome do papel
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionUser {
    pub session_id: uuid::Uuid,
    pub user_id: i64,
    pub full_name: String,
    pub role_id: Option<i32>,
    pub role_name: Option<String>,
    pub active: bool,
}

// Login: usuário + papel (LEFT JOIN roles)
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LoginCandidate {
    pub id: i64,
    pub password_hash: String,
    pub full_name: String,
    pub active: bool,
    pub role_id: Option<i32>,
    pub role_name: Option<String>,
}

// Item das listas de seleção (analistas, responsáveis)
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct UserOption {
    pub id: i64,
    #[serde(rename = "usuario")]
    pub username: String,
    #[serde(rename = "nombre")]
    pub full_name: String,
}

// Nome e e-mail para notificações
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Contact {
    pub full_name: String,
    pub email: String,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    #[serde(rename = "usuario", default)]
    #[validate(length(min = 1, message = "El usuario es obligatorio."))]
    #[schema(example = "jperez")]
    pub username: String,

    #[serde(rename = "clave", default)]
    #[validate(length(min = 1, message = "La clave es obligatoria."))]
    #[schema(example = "secreto123")]
    pub password: String,
}

// Resposta de autenticação
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    #[schema(example = "analista")]
    pub rol: String,
    #[schema(example = 2)]
    pub rol_id: i32,
    #[schema(example = 7)]
    pub user_id: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserPayload {
    #[serde(rename = "usuario", default)]
    #[validate(length(min = 1, message = "Faltan campos"))]
    pub username: String,

    #[serde(rename = "clave", default)]
    #[validate(length(min = 1, message = "Faltan campos"))]
    pub password: String,

    #[serde(rename = "nombre", default)]
    #[validate(length(min = 1, message = "Faltan campos"))]
    pub full_name: String,

    #[serde(rename = "correo", default)]
    #[validate(email(message = "El correo no es válido."))]
    pub email: String,

    #[serde(rename = "rol_id", default, deserialize_with = "lenient::opt_i64")]
    #[validate(required(message = "Faltan campos"))]
    #[schema(value_type = Option<i64>, example = 3)]
    pub role_id: Option<i64>,

    #[serde(rename = "sede", default)]
    #[validate(length(min = 1, message = "Faltan campos"))]
    pub site: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserPayload {
    #[serde(rename = "nombre", default)]
    #[validate(length(min = 1, message = "Faltan campos obligatorios"))]
    pub full_name: String,

    #[serde(rename = "correo", default)]
    #[validate(email(message = "El correo no es válido."))]
    pub email: String,

    #[serde(rename = "rol_id", default, deserialize_with = "lenient::opt_i64")]
    #[validate(required(message = "Faltan campos obligatorios"))]
    #[schema(value_type = Option<i64>, example = 3)]
    pub role_id: Option<i64>,

    #[serde(rename = "sede", default)]
    #[validate(length(min = 1, message = "Faltan campos obligatorios"))]
    pub site: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ToggleActivePayload {
    #[serde(rename = "activo", default, deserialize_with = "lenient::opt_bool")]
    #[schema(value_type = Option<bool>)]
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct UserSearchQuery {
    /// Usuario exacto, correo exacto o parte del nombre
    pub q: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ids_round_trip() {
        for role in [Role::Admin, Role::Analyst, Role::Responsible, Role::Auditor] {
            assert_eq!(Role::from_id(role.id() as i64), Some(role));
        }
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(5), None);
    }

    #[test]
    fn create_user_payload_requires_every_field() {
        let payload: CreateUserPayload =
            serde_json::from_str(r#"{"usuario":"ana","clave":"123456","nombre":"Ana"}"#).unwrap();
        let errors = payload.validate().unwrap_err();
        // rol_id, correo e sede
        assert_eq!(errors.field_errors().len(), 3);
    }

    #[test]
    fn any_non_empty_password_is_accepted() {
        let body = |clave: &str| {
            format!(
                r#"{{"usuario":"ana","clave":"{clave}","nombre":"Ana","correo":"ana@mtd.co","rol_id":"3","sede":"Cali"}}"#
            )
        };

        let short: CreateUserPayload = serde_json::from_str(&body("1")).unwrap();
        assert!(short.validate().is_ok());

        let empty: CreateUserPayload = serde_json::from_str(&body("")).unwrap();
        let errors = empty.validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 1);
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn user_serializes_with_panel_field_names() {
        let user = User {
            id: 1,
            username: "ana".into(),
            password_hash: "hash".into(),
            full_name: "Ana".into(),
            email: "ana@x.co".into(),
            role_id: Some(2),
            site: "Cali".into(),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["usuario"], "ana");
        assert_eq!(value["rol_id"], 2);
        assert!(value.get("password_hash").is_none());
    }
}
