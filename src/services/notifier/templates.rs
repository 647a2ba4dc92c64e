// src/services/notifier/templates.rs

use chrono::NaiveDate;

use super::{NotificationEvent, NotificationKind};
use crate::models::ticket::display_id;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMail {
    pub subject: String,
    pub text: String,
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

/// Assunto e corpo (texto puro) da notificação para a equipe.
pub fn render_notification(event: &NotificationEvent, recipient_name: &str) -> RenderedMail {
    let code = display_id(event.seq);
    let due = format_date(event.due_date);

    let (subject, text) = match event.kind {
        NotificationKind::Reopened => (
            format!("PQRS reabierta {code}"),
            format!(
                "Hola {recipient_name},\n\nLa PQRS {code} fue reabierta y requiere tu gestión nuevamente.\n\nGracias."
            ),
        ),
        NotificationKind::Finalized => (
            format!("PQRS finalizada {code}"),
            format!("Hola {recipient_name},\n\nLa PQRS {code} ha sido marcada como finalizada.\n\nGracias."),
        ),
        NotificationKind::BackInProgress => (
            format!("PQRS en gestión {code}"),
            format!(
                "Hola {recipient_name},\n\nLa PQRS {code} ha cambiado su estado a \"En gestión\".\n\nGracias."
            ),
        ),
        NotificationKind::ReassignmentAnswered => (
            format!("Reasignación respondida {code}"),
            format!("Hola {recipient_name},\n\nEl responsable ha respondido la reasignación de {code}.\nSaludos."),
        ),
        NotificationKind::ReassignmentRequested => (
            format!("REASIGNACIÓN {code}"),
            format!(
                "Hola {recipient_name},\n\nLa respuesta no fue satisfactoria. Debes volver a dar respuesta.\nFecha limite de Respuesta: {due}.\nObservacion: {}\n\nGracias.",
                event.observations.as_deref().unwrap_or_default()
            ),
        ),
        NotificationKind::AreaResponded => (
            format!("PQRS respondida {code}"),
            format!("Hola {recipient_name},\n\nEl responsable ha respondido {code}.\nSaludos."),
        ),
        NotificationKind::Assigned => (
            format!("PQRS asignada {code}"),
            format!(
                "Hola {recipient_name},\n\nTienes asignada la PQRS {code}. Con Fecha Limite de Respuesta {due}\nSaludos."
            ),
        ),
    };

    RenderedMail { subject, text }
}

// --- Mensagem ao solicitante ---

pub const SIGNATURE_CID: &str = "firma-pqrs";

pub struct RequesterLetter<'a> {
    pub seq: i64,
    pub requester_name: &'a str,
    pub message: &'a str,
    pub analyst_name: &'a str,
    pub analyst_email: &'a str,
    pub organization: &'a str,
    pub with_signature: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedLetter {
    pub subject: String,
    pub text: String,
    pub html: String,
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_requester_letter(letter: &RequesterLetter<'_>) -> RenderedLetter {
    let RequesterLetter {
        seq,
        requester_name,
        message,
        analyst_name,
        analyst_email,
        organization,
        with_signature,
    } = *letter;

    let subject = format!("Respuesta a tu PQRS {}", display_id(seq));

    let text = format!(
        "Buen día {requester_name}, cordial saludo.\n\n\
         Muchas gracias por ponerse en contacto con {organization}, para nosotros es muy importante mantener una comunicación asertiva con nuestros usuarios, por esta razón damos respuesta a su requerimiento interpuesto.\n\n\
         {message}\n\n\
         Atentamente,\n{analyst_name}\nAnalista PQRS - {organization}\n{analyst_email}\n\n\
         Para cualquier inquietud y/o solicitud debe ser diligenciada nuevamente por el formulario.\n\
         Este correo es únicamente para envío de información; por favor NO RESPONDER a este correo.\n\
         Gracias por comunicarse con nosotros."
    );

    let signature = if with_signature {
        format!(
            r#"<div style="text-align:left; margin:16px 0;"><img src="cid:{SIGNATURE_CID}" alt="{org}" width="900" style="display:block;width:900px;max-width:100%;height:auto;margin:0;"/></div>"#,
            org = escape_html(organization)
        )
    } else {
        String::new()
    };

    let html = format!(
        r#"<div style="font-family:Arial, sans-serif; line-height:1.5; color:#222;">
<p>Buen día <strong>{name}</strong>, cordial saludo.</p>
<p>Muchas gracias por ponerse en contacto con {org}, para nosotros es muy importante mantener una comunicación asertiva con nuestros usuarios,<br>por esta razón damos respuesta a su requerimiento interpuesto.</p>
<p style="white-space:pre-line">{message}</p>
<p style="margin-top:24px">Atentamente,<br/><strong>{analyst}</strong><br/>Analista PQRS - {org}<br/></p>
<p style="font-size:12px;color:#666">Para cualquier inquietud y/o solicitud debe ser diligenciada nuevamente por el formulario.<br/>Este correo es únicamente para envío de información; por favor no responder a este correo.</p>
{signature}
</div>"#,
        name = escape_html(requester_name),
        org = escape_html(organization),
        message = escape_html(message),
        analyst = escape_html(analyst_name),
    );

    RenderedLetter { subject, text, html }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: NotificationKind) -> NotificationEvent {
        NotificationEvent {
            kind,
            seq: 15,
            recipient_id: 3,
            due_date: NaiveDate::from_ymd_opt(2025, 7, 4),
            observations: Some("Falta soporte".into()),
        }
    }

    #[test]
    fn every_kind_mentions_the_case_code() {
        use NotificationKind::*;
        for kind in [
            Reopened,
            Finalized,
            BackInProgress,
            ReassignmentAnswered,
            ReassignmentRequested,
            AreaResponded,
            Assigned,
        ] {
            let mail = render_notification(&event(kind), "Luis");
            assert!(mail.subject.contains("SAC-15"), "{kind:?}");
            assert!(mail.text.starts_with("Hola Luis,"), "{kind:?}");
        }
    }

    #[test]
    fn reassignment_carries_due_date_and_observation() {
        let mail = render_notification(&event(NotificationKind::ReassignmentRequested), "Luis");
        assert_eq!(mail.subject, "REASIGNACIÓN SAC-15");
        assert!(mail.text.contains("Fecha limite de Respuesta: 2025-07-04."));
        assert!(mail.text.contains("Observacion: Falta soporte"));
    }

    #[test]
    fn requester_letter_escapes_html_only_in_html_part() {
        let letter = render_requester_letter(&RequesterLetter {
            seq: 8,
            requester_name: "Ana <script>",
            message: "Su cita es el lunes & martes",
            analyst_name: "Carlos",
            analyst_email: "carlos@mtd.co",
            organization: "MTD",
            with_signature: true,
        });
        assert_eq!(letter.subject, "Respuesta a tu PQRS SAC-8");
        assert!(letter.text.contains("Buen día Ana <script>"));
        assert!(letter.html.contains("Ana &lt;script&gt;"));
        assert!(letter.html.contains("lunes &amp; martes"));
        assert!(letter.html.contains("cid:firma-pqrs"));
        assert!(letter.text.contains("carlos@mtd.co"));
    }

    #[test]
    fn requester_letter_without_signature_has_no_cid() {
        let letter = render_requester_letter(&RequesterLetter {
            seq: 8,
            requester_name: "Ana",
            message: "Hola",
            analyst_name: "Carlos",
            analyst_email: "carlos@mtd.co",
            organization: "MTD",
            with_signature: false,
        });
        assert!(!letter.html.contains("cid:"));
    }
}
