// src/models/ticket.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::common::lenient;

// --- PQRS (linha completa) ---
//
// Os nomes no JSON são os que o painel e o formulário público já usam.

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Ticket {
    #[schema(example = 128)]
    pub seq: i64,

    // Formulário público
    #[serde(rename = "persona")]
    pub requester_type: String,
    #[serde(rename = "tipo")]
    pub document_type: String,
    #[serde(rename = "documeto_paciente")]
    pub document_number: String,
    #[serde(rename = "nombre")]
    pub full_name: String,
    #[serde(rename = "sexo")]
    pub sex: String,
    #[serde(rename = "origen")]
    pub origin: String,
    #[serde(rename = "departamento")]
    pub department: String,
    #[serde(rename = "municipio")]
    pub municipality: String,
    #[serde(rename = "direccion")]
    pub address: String,
    #[serde(rename = "celular")]
    pub phone: String,
    #[serde(rename = "correo")]
    pub email: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "archivo_nombre")]
    pub attachment_name: Option<String>,
    #[serde(rename = "archivo_ruta")]
    pub attachment_path: Option<String>,
    #[serde(rename = "enviado_at")]
    pub submitted_at: DateTime<Utc>,

    // Tipificação
    #[serde(rename = "estado")]
    pub status: Option<String>,
    #[serde(rename = "observaciones")]
    pub observations: Option<String>,
    #[serde(rename = "medio")]
    pub channel: Option<String>,
    #[serde(rename = "eps")]
    pub health_plan: Option<String>,
    #[serde(rename = "analista")]
    pub analyst_id: Option<i64>,
    #[serde(rename = "area_encargada")]
    pub handling_area: Option<String>,
    #[serde(rename = "responsable")]
    pub responsible_id: Option<i64>,
    #[serde(rename = "tipo_de_requerimiento")]
    pub requirement_type: Option<String>,
    #[serde(rename = "tipo_de_servicio")]
    pub service_type: Option<String>,
    #[serde(rename = "subtipologia")]
    pub subtype: Option<String>,
    #[serde(rename = "medio_de_contacto")]
    pub contact_medium: Option<String>,
    #[serde(rename = "requerimiento_de_la_solicitud")]
    pub request_requirement: Option<String>,
    #[serde(rename = "atribuible")]
    pub attributable: Option<String>,
    #[serde(rename = "por_que")]
    pub rationale: Option<String>,

    // ANS
    #[serde(rename = "fecha_limite_de_rta")]
    pub due_date: Option<NaiveDate>,
    #[serde(rename = "fecha_de_cierre")]
    pub closed_on: Option<NaiveDate>,
    #[serde(rename = "indicador_ans")]
    pub sla_indicator: Option<String>,
    #[serde(rename = "oportunidad_real")]
    pub real_elapsed_days: Option<i32>,
    #[serde(rename = "oportunidad_operativa")]
    pub operational_elapsed_days: Option<i32>,
    #[serde(rename = "vencido")]
    pub overdue: Option<String>,

    // Respostas do responsável
    #[serde(rename = "respuesta_al_area_encargada")]
    pub area_response: Option<String>,
    #[serde(rename = "fecha_respuesta_responsable")]
    pub responded_on: Option<NaiveDate>,
    #[serde(rename = "pregunta_reasignacion")]
    pub reassignment_requested: Option<String>,
    #[serde(rename = "respuesta_al_area_encargada_reasignacion")]
    pub reassignment_response: Option<String>,
    #[serde(rename = "fecha_respuesta_responsable_reasignacion")]
    pub reassignment_responded_on: Option<NaiveDate>,

    // Mensagem ao solicitante
    #[serde(rename = "mensaje_paciente")]
    pub patient_message: Option<String>,
    #[serde(rename = "fecha_envio_paciente")]
    pub patient_message_sent_at: Option<DateTime<Utc>>,
    #[serde(rename = "enviado_por_id")]
    pub patient_message_sender_id: Option<i64>,
}

impl Ticket {
    /// Código público do caso.
    pub fn display_id(&self) -> String {
        display_id(self.seq)
    }
}

pub fn display_id(seq: i64) -> String {
    format!("SAC-{seq}")
}

// Detalhe: a linha completa + quem enviou a mensagem ao solicitante
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct TicketDetail {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub ticket: Ticket,
    pub enviado_por_nombre: Option<String>,
    pub enviado_por_correo: Option<String>,
}

// Linha da listagem paginada
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct TicketSummary {
    pub seq: i64,
    #[serde(rename = "persona")]
    pub requester_type: String,
    #[serde(rename = "tipo")]
    pub document_type: String,
    #[serde(rename = "documeto_paciente")]
    pub document_number: String,
    #[serde(rename = "nombre")]
    pub full_name: String,
    #[serde(rename = "correo")]
    pub email: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "enviado_at")]
    pub submitted_at: DateTime<Utc>,
    #[serde(rename = "fecha_de_cierre")]
    pub closed_on: Option<NaiveDate>,
    #[serde(rename = "fecha_limite_de_rta")]
    pub due_date: Option<NaiveDate>,
    #[serde(rename = "fecha_respuesta_responsable")]
    pub responded_on: Option<NaiveDate>,
    #[serde(rename = "estado")]
    pub status: Option<String>,
    #[serde(rename = "observaciones")]
    pub observations: Option<String>,
    #[serde(rename = "responsable")]
    pub responsible_id: Option<i64>,

    // Calculado no momento da consulta ("SI"/"NO"), não vem do banco
    #[sqlx(skip)]
    pub vencido: Option<String>,
}

// --- Formulário público ---

#[derive(Debug, Clone, Default, Validate)]
pub struct IntakeForm {
    #[validate(length(min = 1, max = 100, message = "Campo obligatorio"))]
    pub requester_type: String,
    #[validate(length(min = 1, max = 50, message = "Campo obligatorio"))]
    pub document_type: String,
    #[validate(length(min = 1, max = 50, message = "Campo obligatorio"))]
    pub document_number: String,
    #[validate(length(min = 1, max = 200, message = "Campo obligatorio"))]
    pub full_name: String,
    #[validate(length(min = 1, max = 30, message = "Campo obligatorio"))]
    pub sex: String,
    #[validate(length(min = 1, max = 100, message = "Campo obligatorio"))]
    pub origin: String,
    #[validate(length(min = 1, max = 100, message = "Campo obligatorio"))]
    pub department: String,
    #[validate(length(min = 1, max = 100, message = "Campo obligatorio"))]
    pub municipality: String,
    #[validate(length(min = 1, max = 300, message = "Campo obligatorio"))]
    pub address: String,
    #[validate(length(min = 1, max = 30, message = "Campo obligatorio"))]
    pub phone: String,
    #[validate(email(message = "El correo no es válido."))]
    pub email: String,
    #[validate(length(min = 1, max = 5000, message = "La descripción es obligatoria (máximo 5000 caracteres)."))]
    pub description: String,
}

impl IntakeForm {
    /// Preenche o campo a partir do nome usado no formulário. Nomes desconhecidos são ignorados.
    pub fn set_field(&mut self, name: &str, value: String) {
        let slot = match name {
            "persona" => &mut self.requester_type,
            "tipo" => &mut self.document_type,
            "documeto_paciente" => &mut self.document_number,
            "nombre" => &mut self.full_name,
            "sexo" => &mut self.sex,
            "origen" => &mut self.origin,
            "departamento" => &mut self.department,
            "municipio" => &mut self.municipality,
            "direccion" => &mut self.address,
            "celular" => &mut self.phone,
            "correo" => &mut self.email,
            "descripcion" => &mut self.description,
            _ => return,
        };
        *slot = value.trim().to_string();
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(rename = "insertId")]
    #[schema(example = 129)]
    pub insert_id: i64,
}

// --- Tipificação (POST /api/tipificar) ---

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct ClassifyPayload {
    #[serde(deserialize_with = "lenient::opt_i64")]
    #[schema(value_type = Option<i64>, example = 128)]
    pub seq: Option<i64>,

    #[serde(rename = "medio", deserialize_with = "lenient::opt_text")]
    pub channel: Option<String>,
    #[serde(rename = "eps", deserialize_with = "lenient::opt_text")]
    pub health_plan: Option<String>,
    #[serde(rename = "analista", deserialize_with = "lenient::opt_i64")]
    #[schema(value_type = Option<i64>)]
    pub analyst_id: Option<i64>,
    #[serde(rename = "area_encargada", deserialize_with = "lenient::opt_text")]
    pub handling_area: Option<String>,
    #[serde(rename = "responsable", deserialize_with = "lenient::opt_i64")]
    #[schema(value_type = Option<i64>)]
    pub responsible_id: Option<i64>,
    #[serde(rename = "tipo_de_requerimiento", deserialize_with = "lenient::opt_text")]
    pub requirement_type: Option<String>,
    #[serde(rename = "tipo_de_servicio", deserialize_with = "lenient::opt_text")]
    pub service_type: Option<String>,
    #[serde(rename = "subtipologia", deserialize_with = "lenient::opt_text")]
    pub subtype: Option<String>,
    #[serde(rename = "medio_de_contacto", deserialize_with = "lenient::opt_text")]
    pub contact_medium: Option<String>,
    #[serde(rename = "requerimiento_de_la_solicitud", deserialize_with = "lenient::opt_text")]
    pub request_requirement: Option<String>,
    #[serde(rename = "atribuible", deserialize_with = "lenient::opt_text")]
    pub attributable: Option<String>,
    #[serde(rename = "por_que", deserialize_with = "lenient::opt_text")]
    #[validate(length(max = 5000))]
    pub rationale: Option<String>,

    #[serde(rename = "fecha_limite_de_rta", deserialize_with = "lenient::opt_date")]
    #[schema(value_type = Option<String>, format = Date)]
    pub due_date: Option<NaiveDate>,
    #[serde(rename = "fecha_de_cierre", deserialize_with = "lenient::opt_date")]
    #[schema(value_type = Option<String>, format = Date)]
    pub closed_on: Option<NaiveDate>,
    #[serde(rename = "estado", deserialize_with = "lenient::opt_text")]
    #[schema(example = "En gestión")]
    pub status: Option<String>,
    #[serde(rename = "observaciones", deserialize_with = "lenient::opt_text")]
    #[validate(length(max = 5000))]
    pub observations: Option<String>,

    #[serde(rename = "respuesta_al_area_encargada", deserialize_with = "lenient::opt_text")]
    #[validate(length(max = 10000))]
    pub area_response: Option<String>,
    #[serde(rename = "fecha_respuesta_responsable", deserialize_with = "lenient::opt_date")]
    #[schema(value_type = Option<String>, format = Date)]
    pub responded_on: Option<NaiveDate>,
    #[serde(rename = "pregunta_reasignacion", deserialize_with = "lenient::opt_text")]
    #[schema(example = "NO")]
    pub reassignment_requested: Option<String>,
    #[serde(rename = "respuesta_al_area_encargada_reasignacion", deserialize_with = "lenient::opt_text")]
    #[validate(length(max = 10000))]
    pub reassignment_response: Option<String>,
    #[serde(rename = "fecha_respuesta_responsable_reasignacion", deserialize_with = "lenient::opt_date")]
    #[schema(value_type = Option<String>, format = Date)]
    pub reassignment_responded_on: Option<NaiveDate>,
}

impl ClassifyPayload {
    pub fn asks_reassignment(&self) -> bool {
        self.reassignment_requested
            .as_deref()
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("SI"))
    }
}

// Os quatro campos que o responsável pode escrever. Ausente mantém o valor gravado.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponsibleAnswer {
    pub area_response: Option<String>,
    pub reassignment_response: Option<String>,
    pub responded_on: Option<NaiveDate>,
    pub reassignment_responded_on: Option<NaiveDate>,
}

impl From<&ClassifyPayload> for ResponsibleAnswer {
    fn from(payload: &ClassifyPayload) -> Self {
        Self {
            area_response: payload.area_response.clone(),
            reassignment_response: payload.reassignment_response.clone(),
            responded_on: payload.responded_on,
            reassignment_responded_on: payload.reassignment_responded_on,
        }
    }
}

// Colunas derivadas das datas no momento da gravação
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlaSnapshot {
    pub overdue: Option<String>,
    pub sla_indicator: Option<String>,
    pub real_elapsed_days: Option<i32>,
    pub operational_elapsed_days: Option<i32>,
}

// --- Mensagem ao solicitante (POST /api/enviar-paciente) ---

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct PatientMessageForm {
    pub seq: Option<i64>,
    pub message: Option<String>,
    pub attachment: Option<UploadedFile>,
}

// --- Listagem ---

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(default)]
pub struct TicketListQuery {
    /// Máximo de linhas (padrão 10)
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub limit: Option<i64>,
    /// Deslocamento (padrão 0)
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub offset: Option<i64>,
    /// pendiente | en gestión | resuelta (ou valor literal)
    pub estado: Option<String>,
    /// Parte do número do documento
    pub documeto_paciente: Option<String>,
    /// Parte do e-mail do solicitante
    pub correo: Option<String>,
    /// AAAA-MM-DD (inclusive)
    pub fecha_desde: Option<String>,
    /// AAAA-MM-DD (inclusive)
    pub fecha_hasta: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketPage {
    pub success: bool,
    pub total: i64,
    pub data: Vec<TicketSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_payload_accepts_panel_form() {
        let payload: ClassifyPayload = serde_json::from_str(
            r#"{
                "seq": "12", "medio": "WEB", "analista": "2", "responsable": "5",
                "estado": "En gestión", "fecha_limite_de_rta": "2025-05-10",
                "pregunta_reasignacion": "SI", "respuesta_al_area_encargada": null,
                "vencido": "NO", "radicado": ""
            }"#,
        )
        .unwrap();
        assert_eq!(payload.seq, Some(12));
        assert_eq!(payload.analyst_id, Some(2));
        assert_eq!(payload.responsible_id, Some(5));
        assert_eq!(payload.due_date, NaiveDate::from_ymd_opt(2025, 5, 10));
        assert!(payload.asks_reassignment());
        assert!(payload.area_response.is_none());
    }

    #[test]
    fn intake_form_maps_public_field_names() {
        let mut form = IntakeForm::default();
        form.set_field("documeto_paciente", " 1020 ".into());
        form.set_field("correo", "ana@correo.co".into());
        form.set_field("desconocido", "x".into());
        assert_eq!(form.document_number, "1020");
        assert_eq!(form.email, "ana@correo.co");
        assert!(form.validate().is_err());
    }

    #[test]
    fn display_id_uses_sac_prefix() {
        assert_eq!(display_id(42), "SAC-42");
    }
}
