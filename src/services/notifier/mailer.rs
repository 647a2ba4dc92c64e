// src/services/notifier/mailer.rs

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::{common::error::AppError, config::SmtpSettings};

#[derive(Debug, Clone)]
pub struct MailAttachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct InlineImage {
    pub content_id: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

// Um e-mail pronto para sair. O remetente (endereço) é sempre o da conta SMTP.
#[derive(Debug, Clone, Default)]
pub struct OutgoingMail {
    pub from_name: Option<String>,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
    pub attachments: Vec<MailAttachment>,
    pub inline_images: Vec<InlineImage>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), AppError>;
}

fn content_type(raw: &str) -> Result<ContentType, AppError> {
    ContentType::parse(raw).map_err(|e| AppError::Mail(format!("content-type inválido '{raw}': {e}")))
}

/// Monta a mensagem MIME: texto puro, ou alternativa texto/HTML com imagens
/// embutidas e anexos.
pub fn build_message(sender: &str, mail: OutgoingMail) -> Result<Message, AppError> {
    let from_address = sender
        .parse()
        .map_err(|e| AppError::Mail(format!("remetente inválido: {e}")))?;
    let to: Mailbox = mail
        .to
        .parse()
        .map_err(|e| AppError::Mail(format!("destinatário inválido: {e}")))?;

    let builder = Message::builder()
        .from(Mailbox::new(mail.from_name, from_address))
        .to(to)
        .subject(mail.subject);

    let message = match mail.html {
        None if mail.attachments.is_empty() => builder.singlepart(SinglePart::plain(mail.text)),
        html => {
            let mut body = match html {
                Some(html) => MultiPart::alternative_plain_html(mail.text, html),
                None => MultiPart::mixed().singlepart(SinglePart::plain(mail.text)),
            };

            if !mail.inline_images.is_empty() {
                let mut related = MultiPart::related().multipart(body);
                for image in mail.inline_images {
                    related = related.singlepart(
                        Attachment::new_inline(image.content_id)
                            .body(image.bytes, content_type(&image.content_type)?),
                    );
                }
                body = related;
            }

            if !mail.attachments.is_empty() {
                let mut mixed = MultiPart::mixed().multipart(body);
                for file in mail.attachments {
                    mixed = mixed.singlepart(
                        Attachment::new(file.file_name).body(file.bytes, content_type(&file.content_type)?),
                    );
                }
                body = mixed;
            }

            builder.multipart(body)
        }
    };

    message.map_err(|e| AppError::Mail(e.to_string()))
}

// Envio real via SMTP (lettre)
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: String,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> anyhow::Result<Self> {
        // `secure` = TLS implícito (465); caso contrário STARTTLS
        let builder = if settings.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
        };

        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(settings.user.clone(), settings.password.clone()))
            .build();

        Ok(Self {
            transport,
            sender: settings.user.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), AppError> {
        let message = build_message(&self.sender, mail)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Mail(e.to_string()))?;
        Ok(())
    }
}

// Sem SMTP configurado: nada sai, e quem chamou fica sabendo.
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), AppError> {
        tracing::warn!(to = %mail.to, subject = %mail.subject, "SMTP não configurado, e-mail descartado");
        Err(AppError::Mail("SMTP não configurado".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(mail: OutgoingMail) -> String {
        let message = build_message("pqrs@mtd.co", mail).unwrap();
        String::from_utf8(message.formatted()).unwrap()
    }

    #[test]
    fn plain_notification_is_single_part() {
        let raw = render(OutgoingMail {
            to: "luis@mtd.co".into(),
            subject: "PQRS asignada SAC-1".into(),
            text: "Hola Luis".into(),
            ..Default::default()
        });
        assert!(raw.contains("To: luis@mtd.co"));
        assert!(raw.contains("From: pqrs@mtd.co"));
        assert!(!raw.contains("multipart/"));
    }

    #[test]
    fn letter_with_signature_and_attachment_is_nested_multipart() {
        let raw = render(OutgoingMail {
            from_name: Some("Carlos - MTD".into()),
            to: "ana@correo.co".into(),
            subject: "Respuesta".into(),
            text: "texto".into(),
            html: Some("<p>html</p>".into()),
            attachments: vec![MailAttachment {
                file_name: "soporte.pdf".into(),
                content_type: "application/pdf".into(),
                bytes: b"%PDF-1.4".to_vec(),
            }],
            inline_images: vec![InlineImage {
                content_id: "firma-pqrs".into(),
                content_type: "image/jpeg".into(),
                bytes: vec![0xFF, 0xD8, 0xFF],
            }],
        });
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("multipart/related"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("Content-ID: <firma-pqrs>"));
        assert!(raw.contains("soporte.pdf"));
    }

    #[test]
    fn rejects_bad_recipient() {
        let result = build_message(
            "pqrs@mtd.co",
            OutgoingMail {
                to: "not an address".into(),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(AppError::Mail(_))));
    }
}
