// src/services/notifier.rs
//
// Notificações por e-mail disparadas pelas mudanças de estado das PQRS.
// A tipificação só produz o evento; a entrega fica com o `NotificationWorker`.

pub mod mailer;
pub mod templates;
pub mod worker;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{common::error::AppError, models::auth::Contact};

pub use mailer::{InlineImage, MailAttachment, Mailer, OutgoingMail, SmtpMailer};
pub use worker::{DeliveryOutcome, NotificationWorker, Notifier, RetryPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Reopened,
    Finalized,
    BackInProgress,
    ReassignmentAnswered,
    ReassignmentRequested,
    AreaResponded,
    Assigned,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Reopened => "reopened",
            NotificationKind::Finalized => "finalized",
            NotificationKind::BackInProgress => "back_in_progress",
            NotificationKind::ReassignmentAnswered => "reassignment_answered",
            NotificationKind::ReassignmentRequested => "reassignment_requested",
            NotificationKind::AreaResponded => "area_responded",
            NotificationKind::Assigned => "assigned",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub seq: i64,
    pub recipient_id: i64,
    pub due_date: Option<NaiveDate>,
    pub observations: Option<String>,
}

// De onde vem o nome e o e-mail do destinatário
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    async fn lookup(&self, user_id: i64) -> Result<Option<Contact>, AppError>;
}
