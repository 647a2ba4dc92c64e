// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use crate::config::SESSION_COOKIE;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Saúde ---
        handlers::health::health,
        handlers::health::db_ping,

        // --- Auth ---
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::profile,

        // --- Usuarios ---
        handlers::users::create_user,
        handlers::users::update_user,
        handlers::users::toggle_active,
        handlers::users::search_user,
        handlers::users::users_by_role,

        // --- PQRS ---
        handlers::tickets::submit,
        handlers::tickets::list_tickets,
        handlers::tickets::get_ticket,
        handlers::workflow::classify,
        handlers::messages::send_to_requester,

        // --- Reportes ---
        handlers::reports::stats,
        handlers::reports::export_tickets,

        // --- Anexos ---
        handlers::uploads::download,
        handlers::uploads::preview,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Role,
            models::auth::User,
            models::auth::UserOption,
            models::auth::LoginPayload,
            models::auth::LoginResponse,
            models::auth::CreateUserPayload,
            models::auth::UpdateUserPayload,
            models::auth::ToggleActivePayload,

            // --- PQRS ---
            models::ticket::Ticket,
            models::ticket::TicketDetail,
            models::ticket::TicketSummary,
            models::ticket::TicketPage,
            models::ticket::SubmitResponse,
            models::ticket::ClassifyPayload,

            // --- Reportes ---
            models::report::TicketStats,

            // --- Respostas genéricas ---
            models::response::ActionResponse,
        )
    ),
    tags(
        (name = "Saúde", description = "Verificações de vida do processo e do banco"),
        (name = "Auth", description = "Login, logout e perfil da sessão"),
        (name = "Usuarios", description = "Cadastro e consulta da equipe"),
        (name = "PQRS", description = "Formulário público, consulta e tipificação"),
        (name = "Reportes", description = "Indicadores e exportação"),
        (name = "Anexos", description = "Download e visualização dos arquivos enviados")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "session_cookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
        );
    }
}
