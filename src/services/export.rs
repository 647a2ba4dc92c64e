// src/services/export.rs
//
// Planilha "Respuestas" com todas as PQRS do filtro, sem paginação.

use std::collections::HashMap;

use chrono::{DateTime, Local, NaiveDate, Utc};
use rust_xlsxwriter::{Format, Workbook};

use crate::{common::error::AppError, models::ticket::TicketDetail};

pub const SHEET_NAME: &str = "Respuestas";
pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const COLUMNS: &[&str] = &[
    "id",
    "persona",
    "tipo",
    "documeto_paciente",
    "nombre",
    "sexo",
    "origen",
    "departamento",
    "municipio",
    "direccion",
    "celular",
    "correo",
    "descripcion",
    "archivo_nombre",
    "archivo_ruta",
    "enviado_at",
    "estado",
    "observaciones",
    "medio",
    "eps",
    "analista",
    "area_encargada",
    "responsable",
    "tipo_de_requerimiento",
    "tipo_de_servicio",
    "subtipologia",
    "medio_de_contacto",
    "requerimiento_de_la_solicitud",
    "atribuible",
    "por_que",
    "fecha_limite_de_rta",
    "respuesta_al_area_encargada",
    "indicador_ans",
    "oportunidad_real",
    "oportunidad_operativa",
    "fecha_de_cierre",
    "fecha_respuesta_responsable",
    "pregunta_reasignacion",
    "respuesta_al_area_encargada_reasignacion",
    "fecha_respuesta_responsable_reasignacion",
    "mensaje_paciente",
    "fecha_envio_paciente",
    "enviado_por_nombre",
    "vencido",
];

pub fn file_name(today: NaiveDate) -> String {
    format!("respuestas_{}.xlsx", today.format("%Y%m%d"))
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn date(value: Option<NaiveDate>) -> String {
    value.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

fn number<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

// Nome do usuário quando conhecido, senão o próprio id
fn user_name(id: Option<i64>, names: &HashMap<i64, String>) -> String {
    match id {
        Some(id) => names.get(&id).cloned().unwrap_or_else(|| id.to_string()),
        None => String::new(),
    }
}

/// Uma linha da planilha, na mesma ordem de `COLUMNS`.
pub fn row_cells(row: &TicketDetail, names: &HashMap<i64, String>) -> Vec<String> {
    let t = &row.ticket;
    vec![
        t.display_id(),
        t.requester_type.clone(),
        t.document_type.clone(),
        t.document_number.clone(),
        t.full_name.clone(),
        t.sex.clone(),
        t.origin.clone(),
        t.department.clone(),
        t.municipality.clone(),
        t.address.clone(),
        t.phone.clone(),
        t.email.clone(),
        t.description.clone(),
        text(&t.attachment_name),
        text(&t.attachment_path),
        timestamp(Some(t.submitted_at)),
        text(&t.status),
        text(&t.observations),
        text(&t.channel),
        text(&t.health_plan),
        user_name(t.analyst_id, names),
        text(&t.handling_area),
        user_name(t.responsible_id, names),
        text(&t.requirement_type),
        text(&t.service_type),
        text(&t.subtype),
        text(&t.contact_medium),
        text(&t.request_requirement),
        text(&t.attributable),
        text(&t.rationale),
        date(t.due_date),
        text(&t.area_response),
        text(&t.sla_indicator),
        number(t.real_elapsed_days),
        number(t.operational_elapsed_days),
        date(t.closed_on),
        date(t.responded_on),
        text(&t.reassignment_requested),
        text(&t.reassignment_response),
        date(t.reassignment_responded_on),
        text(&t.patient_message),
        timestamp(t.patient_message_sent_at),
        text(&row.enviado_por_nombre),
        text(&t.overdue),
    ]
}

/// Gera o .xlsx em memória. Bloqueante: chamar dentro de `spawn_blocking`.
pub fn build_workbook(rows: &[TicketDetail], names: &HashMap<i64, String>) -> Result<Vec<u8>, AppError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, title) in COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    for (index, row) in rows.iter().enumerate() {
        let line = (index + 1) as u32;
        for (col, value) in row_cells(row, names).iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string(line, col as u16, value)?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::models::ticket::Ticket;

    fn detail() -> TicketDetail {
        TicketDetail {
            ticket: Ticket {
                seq: 31,
                requester_type: "Paciente".into(),
                document_type: "CC".into(),
                document_number: "1020".into(),
                full_name: "Luisa Gómez".into(),
                sex: "F".into(),
                origin: "Web".into(),
                department: "Antioquia".into(),
                municipality: "Medellín".into(),
                address: "Calle 1".into(),
                phone: "3000000000".into(),
                email: "luisa@correo.co".into(),
                description: "Demora en cita".into(),
                attachment_name: None,
                attachment_path: None,
                submitted_at: Utc.with_ymd_and_hms(2025, 3, 1, 15, 0, 0).unwrap(),
                status: Some("En gestión".into()),
                observations: None,
                channel: Some("WEB".into()),
                health_plan: None,
                analyst_id: Some(2),
                handling_area: None,
                responsible_id: Some(99),
                requirement_type: None,
                service_type: None,
                subtype: None,
                contact_medium: None,
                request_requirement: None,
                attributable: None,
                rationale: None,
                due_date: NaiveDate::from_ymd_opt(2025, 3, 10),
                closed_on: None,
                sla_indicator: None,
                real_elapsed_days: None,
                operational_elapsed_days: Some(2),
                overdue: Some("NO".into()),
                area_response: None,
                responded_on: None,
                reassignment_requested: None,
                reassignment_response: None,
                reassignment_responded_on: None,
                patient_message: None,
                patient_message_sent_at: None,
                patient_message_sender_id: None,
            },
            enviado_por_nombre: Some("Ana".into()),
            enviado_por_correo: None,
        }
    }

    fn column(name: &str) -> usize {
        COLUMNS.iter().position(|c| *c == name).unwrap()
    }

    #[test]
    fn row_follows_column_order() {
        let names = HashMap::from([(2, "Marta Ruiz".to_string())]);
        let cells = row_cells(&detail(), &names);

        assert_eq!(cells.len(), COLUMNS.len());
        assert_eq!(cells[column("id")], "SAC-31");
        assert_eq!(cells[column("analista")], "Marta Ruiz");
        // id sem nome conhecido fica como número
        assert_eq!(cells[column("responsable")], "99");
        assert_eq!(cells[column("fecha_limite_de_rta")], "2025-03-10");
        assert_eq!(cells[column("oportunidad_operativa")], "2");
        assert_eq!(cells[column("enviado_por_nombre")], "Ana");
        assert_eq!(cells[column("vencido")], "NO");
        assert_eq!(cells[column("observaciones")], "");
    }

    #[test]
    fn builds_a_zip_container() {
        let bytes = build_workbook(&[detail()], &HashMap::new()).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn file_name_carries_the_date() {
        assert_eq!(
            file_name(NaiveDate::from_ymd_opt(2025, 4, 7).unwrap()),
            "respuestas_20250407.xlsx"
        );
    }
}
