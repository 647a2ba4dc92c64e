// src/common/i18n.rs

use std::collections::HashMap;

pub const DEFAULT_LANG: &str = "es";

// (chave, espanhol, inglês)
const MESSAGES: &[(&str, &str, &str)] = &[
    ("validation_failed", "Uno o más campos son inválidos.", "One or more fields are invalid."),
    ("missing_seq", "Falta seq", "Missing seq"),
    ("invalid_seq", "Seq inválido", "Invalid seq"),
    ("invalid_date", "Fecha inválida", "Invalid date"),
    ("invalid_role", "Rol inválido", "Invalid role"),
    ("missing_fields", "Faltan campos", "Missing fields"),
    ("missing_required_fields", "Faltan campos obligatorios", "Missing required fields"),
    ("missing_query", "Falta query de búsqueda", "Missing search query"),
    ("missing_active", "Falta estado", "Missing active flag"),
    ("missing_message", "Falta seq o mensaje", "Missing seq or message"),
    ("unknown_status", "Estado no reconocido", "Unknown status"),
    ("username_taken", "Usuario ya existe", "Username already exists"),
    ("invalid_credentials", "Credenciales inválidas", "Invalid credentials"),
    ("unauthenticated", "No autorizado", "Unauthorized"),
    ("inactive_user", "Usuario inactivo", "Inactive user"),
    ("role_missing", "Usuario sin rol asignado", "User has no role assigned"),
    ("forbidden", "No autorizado", "Forbidden"),
    ("forbidden_ticket_view", "No autorizado para ver este caso", "Not allowed to view this case"),
    (
        "forbidden_ticket_classify",
        "No autorizado para tipificar este caso",
        "Not allowed to classify this case",
    ),
    ("resolved_locked", "No puedes editar una PQRS resuelta.", "A resolved PQRS cannot be edited."),
    (
        "responsible_fields_only",
        "Solo puedes registrar la respuesta del responsable.",
        "Only the responsible party's response can be recorded.",
    ),
    ("not_found", "No encontrado", "Not found"),
    ("user_not_found", "Usuario no encontrado", "User not found"),
    ("requester_not_found", "Paciente no encontrado", "Requester not found"),
    ("origin_not_allowed", "Origen no permitido por CORS", "Origin not allowed by CORS"),
    ("unsupported_file_type", "Tipo de archivo no permitido", "File type not allowed"),
    ("file_too_large", "Archivo supera el límite (10MB)", "File exceeds the limit (10MB)"),
    ("invalid_multipart", "Formulario inválido", "Invalid form data"),
    ("server_error", "Error de servidor", "Server error"),
    // Sucesso
    ("logged_out", "Sesión cerrada", "Logged out"),
    ("user_created", "Usuario creado", "User created"),
    ("user_updated", "Usuario actualizado", "User updated"),
    ("user_activated", "Usuario activado", "User activated"),
    ("user_deactivated", "Usuario inactivado", "User deactivated"),
    ("status_updated", "Estado actualizado correctamente", "Status updated"),
    ("responsible_answer_saved", "Respuesta del responsable registrada.", "Responsible party answer saved."),
    ("classification_saved", "Tipificación registrada", "Classification saved"),
    ("patient_mail_sent", "Correo enviado al paciente", "Email sent to the requester"),
];

#[derive(Debug, Clone)]
pub struct I18nStore {
    // chave -> (espanhol, inglês)
    messages: HashMap<&'static str, (&'static str, &'static str)>,
}

impl I18nStore {
    pub fn new() -> Self {
        let messages = MESSAGES
            .iter()
            .map(|(key, es, en)| (*key, (*es, *en)))
            .collect();
        Self { messages }
    }

    /// Traduz a chave para o idioma pedido, caindo para o espanhol e depois para a própria chave.
    pub fn translate(&self, lang: &str, key: &str) -> String {
        match self.messages.get(key) {
            Some((_, en)) if lang == "en" => en.to_string(),
            Some((es, _)) => es.to_string(),
            None => key.to_string(),
        }
    }

    pub fn default_message(key: &str) -> &'static str {
        MESSAGES
            .iter()
            .find(|(k, _, _)| *k == key)
            .map(|(_, es, _)| *es)
            .unwrap_or("Error de servidor")
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}
