use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::{common::i18n::I18nStore, middleware::i18n::Locale};

// O erro interno da aplicação. Repositórios e serviços só falam esta língua.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Entrada ausente ou malformada. Carrega a chave da mensagem.
    #[error("Requisição inválida: {0}")]
    BadRequest(&'static str),

    #[error("Estado desconhecido: {0}")]
    UnknownStatus(String),

    #[error("Nome de usuário já existe")]
    UsernameTaken,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Sessão ausente ou expirada")]
    Unauthenticated,

    #[error("Usuário inativo")]
    InactiveUser,

    #[error("Usuário sem papel atribuído")]
    RoleMissing,

    // Autenticado, mas o papel ou a posse do caso não permite. Carrega a chave da mensagem.
    #[error("Acesso negado: {0}")]
    Forbidden(&'static str),

    #[error("Recurso não encontrado: {0}")]
    NotFound(&'static str),

    #[error("Origem não permitida")]
    OriginNotAllowed,

    #[error("Tipo de arquivo não permitido")]
    UnsupportedFileType,

    #[error("Arquivo acima do limite")]
    FileTooLarge,

    #[error("Corpo multipart inválido: {0}")]
    Multipart(String),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro de E/S: {0}")]
    Io(#[from] std::io::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro ao gerar planilha: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("Falha no envio de e-mail: {0}")]
    Mail(String),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

// O formato que vai para o cliente.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<HashMap<String, Vec<String>>>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::BadRequest(_)
            | AppError::UnknownStatus(_)
            | AppError::UsernameTaken
            | AppError::UnsupportedFileType
            | AppError::FileTooLarge
            | AppError::Multipart(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::InactiveUser
            | AppError::RoleMissing
            | AppError::Forbidden(_)
            | AppError::OriginNotAllowed => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Chave de tradução da mensagem pública. Erros internos nunca expõem detalhes.
    pub fn message_key(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_failed",
            AppError::BadRequest(key) | AppError::Forbidden(key) | AppError::NotFound(key) => *key,
            AppError::UnknownStatus(_) => "unknown_status",
            AppError::UsernameTaken => "username_taken",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::Unauthenticated => "unauthenticated",
            AppError::InactiveUser => "inactive_user",
            AppError::RoleMissing => "role_missing",
            AppError::OriginNotAllowed => "origin_not_allowed",
            AppError::UnsupportedFileType => "unsupported_file_type",
            AppError::FileTooLarge => "file_too_large",
            AppError::Multipart(_) => "invalid_multipart",
            _ => "server_error",
        }
    }

    fn log_if_internal(&self) {
        if self.status() == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Erro Interno do Servidor");
        }
    }

    fn validation_details(&self) -> Option<HashMap<String, Vec<String>>> {
        let AppError::ValidationError(errors) = self else {
            return None;
        };
        let mut details = HashMap::new();
        for (field, field_errors) in errors.field_errors() {
            let messages: Vec<String> = field_errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            details.insert(field.to_string(), messages);
        }
        Some(details)
    }

    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        self.log_if_internal();
        ApiError {
            status: self.status(),
            message: store.translate(&locale.0, self.message_key()),
            details: self.validation_details(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "success": false, "message": self.message, "details": details }),
            None => json!({ "success": false, "message": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

// Usado pelos middlewares, que não têm o idioma em mãos: responde no idioma padrão.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log_if_internal();
        ApiError {
            status: self.status(),
            message: I18nStore::default_message(self.message_key()).to_string(),
            details: self.validation_details(),
        }
        .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(AppError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InactiveUser.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Forbidden("forbidden").status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("not_found").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::BadRequest("missing_seq").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::FileTooLarge.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::OriginNotAllowed.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::Mail("smtp down".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::DatabaseError(sqlx::Error::RowNotFound);
        let api = err.to_api_error(&Locale("es".into()), &I18nStore::new());
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.message, "Error de servidor");
    }

    #[test]
    fn translates_by_locale() {
        let store = I18nStore::new();
        let api = AppError::Unauthenticated.to_api_error(&Locale("en".into()), &store);
        assert_eq!(api.message, "Unauthorized");
        let api = AppError::Unauthenticated.to_api_error(&Locale("es".into()), &store);
        assert_eq!(api.message, "No autorizado");
    }
}
