// src/services/notifier/worker.rs

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{
        mpsc::{self, error::TrySendError},
        Semaphore,
    },
    task::JoinSet,
};

use super::{templates, Mailer, NotificationEvent, OutgoingMail, RecipientDirectory};

/// Entregas simultâneas; um destinatário lento não segura a fila inteira.
pub const MAX_IN_FLIGHT: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Espera antes da tentativa `attempt` (1 = primeira, sem espera).
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        self.initial_backoff * 2u32.saturating_pow(attempt - 2)
    }
}

// Lado que produz: os handlers só enfileiram.
#[derive(Clone)]
pub struct Notifier {
    sender: mpsc::Sender<NotificationEvent>,
}

impl Notifier {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<NotificationEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Nunca bloqueia e nunca falha para quem chamou; fila cheia descarta o evento.
    pub fn emit(&self, event: NotificationEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(kind = event.kind.as_str(), seq = event.seq, "Fila de notificações cheia, evento descartado");
            }
            Err(TrySendError::Closed(event)) => {
                tracing::error!(kind = event.kind.as_str(), seq = event.seq, "Worker de notificações encerrado, evento descartado");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent { attempts: u32 },
    NoRecipient,
    Failed { attempts: u32 },
}

pub struct NotificationWorker {
    directory: Arc<dyn RecipientDirectory>,
    mailer: Arc<dyn Mailer>,
    policy: RetryPolicy,
}

impl NotificationWorker {
    pub fn new(directory: Arc<dyn RecipientDirectory>, mailer: Arc<dyn Mailer>, policy: RetryPolicy) -> Self {
        Self { directory, mailer, policy }
    }

    /// Consome a fila até todos os `Notifier` serem descartados.
    /// Cada evento é entregue na própria task, no máximo `MAX_IN_FLIGHT` ao mesmo tempo.
    pub async fn run(self, mut receiver: mpsc::Receiver<NotificationEvent>) {
        tracing::info!("📨 Worker de notificações iniciado");
        let worker = Arc::new(self);
        let permits = Arc::new(Semaphore::new(MAX_IN_FLIGHT));
        let mut in_flight = JoinSet::new();

        while let Some(event) = receiver.recv().await {
            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };
            let worker = worker.clone();
            in_flight.spawn(async move {
                let _permit = permit;
                worker.deliver(&event).await
            });
            while in_flight.try_join_next().is_some() {}
        }

        while in_flight.join_next().await.is_some() {}
        tracing::info!("Worker de notificações encerrado");
    }

    pub async fn deliver(&self, event: &NotificationEvent) -> DeliveryOutcome {
        let kind = event.kind.as_str();
        let mut attempt = 0;

        loop {
            attempt += 1;
            tokio::time::sleep(self.policy.backoff(attempt)).await;

            match self.try_deliver(event).await {
                Ok(true) => {
                    tracing::info!(kind, seq = event.seq, attempt, "Notificação enviada");
                    return DeliveryOutcome::Sent { attempts: attempt };
                }
                Ok(false) => {
                    tracing::warn!(kind, seq = event.seq, recipient = event.recipient_id, "Destinatário sem e-mail, notificação ignorada");
                    return DeliveryOutcome::NoRecipient;
                }
                Err(e) if attempt < self.policy.max_attempts => {
                    tracing::warn!(kind, seq = event.seq, attempt, error = %e, "Falha no envio, nova tentativa");
                }
                Err(e) => {
                    tracing::error!(kind, seq = event.seq, attempt, error = %e, "Notificação não entregue");
                    return DeliveryOutcome::Failed { attempts: attempt };
                }
            }
        }
    }

    // Ok(false): não há para quem mandar
    async fn try_deliver(&self, event: &NotificationEvent) -> Result<bool, crate::common::error::AppError> {
        let Some(contact) = self.directory.lookup(event.recipient_id).await? else {
            return Ok(false);
        };
        if contact.email.trim().is_empty() {
            return Ok(false);
        }

        let rendered = templates::render_notification(event, &contact.full_name);
        self.mailer
            .send(OutgoingMail {
                to: contact.email,
                subject: rendered.subject,
                text: rendered.text,
                ..Default::default()
            })
            .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicU32, Ordering},
            Mutex,
        },
    };

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        common::error::AppError,
        models::auth::Contact,
        services::notifier::NotificationKind,
    };

    struct Directory(HashMap<i64, Contact>);

    #[async_trait]
    impl RecipientDirectory for Directory {
        async fn lookup(&self, user_id: i64) -> Result<Option<Contact>, AppError> {
            Ok(self.0.get(&user_id).cloned())
        }
    }

    // Falha as primeiras `failures` chamadas
    struct FlakyMailer {
        failures: u32,
        calls: AtomicU32,
        sent: Mutex<Vec<OutgoingMail>>,
    }

    impl FlakyMailer {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Mailer for FlakyMailer {
        async fn send(&self, mail: OutgoingMail) -> Result<(), AppError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                return Err(AppError::Mail("timeout".into()));
            }
            self.sent.lock().unwrap().push(mail);
            Ok(())
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
        }
    }

    fn directory() -> Arc<Directory> {
        let mut contacts = HashMap::new();
        contacts.insert(
            5,
            Contact {
                full_name: "Luis".into(),
                email: "luis@mtd.co".into(),
            },
        );
        contacts.insert(
            6,
            Contact {
                full_name: "Sin correo".into(),
                email: "".into(),
            },
        );
        Arc::new(Directory(contacts))
    }

    fn event(recipient_id: i64) -> NotificationEvent {
        NotificationEvent {
            kind: NotificationKind::Assigned,
            seq: 21,
            recipient_id,
            due_date: NaiveDate::from_ymd_opt(2025, 8, 1),
            observations: None,
        }
    }

    #[test]
    fn backoff_doubles_from_initial() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::ZERO);
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn retries_until_sent() {
        let mailer = Arc::new(FlakyMailer::new(2));
        let worker = NotificationWorker::new(directory(), mailer.clone(), fast_policy());

        let outcome = worker.deliver(&event(5)).await;

        assert_eq!(outcome, DeliveryOutcome::Sent { attempts: 3 });
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "luis@mtd.co");
        assert_eq!(sent[0].subject, "PQRS asignada SAC-21");
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let mailer = Arc::new(FlakyMailer::new(10));
        let worker = NotificationWorker::new(directory(), mailer.clone(), fast_policy());

        let outcome = worker.deliver(&event(5)).await;

        assert_eq!(outcome, DeliveryOutcome::Failed { attempts: 3 });
        assert_eq!(mailer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn unknown_or_blank_recipient_is_skipped() {
        let mailer = Arc::new(FlakyMailer::new(0));
        let worker = NotificationWorker::new(directory(), mailer.clone(), fast_policy());

        assert_eq!(worker.deliver(&event(99)).await, DeliveryOutcome::NoRecipient);
        assert_eq!(worker.deliver(&event(6)).await, DeliveryOutcome::NoRecipient);
        assert_eq!(mailer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn worker_drains_queue_and_stops_when_senders_drop() {
        let mailer = Arc::new(FlakyMailer::new(0));
        let worker = NotificationWorker::new(directory(), mailer.clone(), fast_policy());
        let (notifier, receiver) = Notifier::channel(8);

        notifier.emit(event(5));
        notifier.emit(event(5));
        drop(notifier);

        worker.run(receiver).await;
        assert_eq!(mailer.sent.lock().unwrap().len(), 2);
    }

    // Nunca responde para um endereço; os demais passam na hora
    struct StuckMailer {
        stuck: &'static str,
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Mailer for StuckMailer {
        async fn send(&self, mail: OutgoingMail) -> Result<(), AppError> {
            if mail.to == self.stuck {
                std::future::pending::<()>().await;
            }
            self.sent.lock().unwrap().push(mail.to);
            Ok(())
        }
    }

    #[tokio::test]
    async fn stuck_recipient_does_not_hold_the_queue() {
        let mut contacts = HashMap::new();
        for (id, email) in [(5, "lento@mtd.co"), (7, "rapido@mtd.co")] {
            contacts.insert(
                id,
                Contact {
                    full_name: "X".into(),
                    email: email.into(),
                },
            );
        }
        let mailer = Arc::new(StuckMailer {
            stuck: "lento@mtd.co",
            sent: Mutex::new(Vec::new()),
        });
        let worker = NotificationWorker::new(Arc::new(Directory(contacts)), mailer.clone(), fast_policy());
        let (notifier, receiver) = Notifier::channel(8);
        let handle = tokio::spawn(worker.run(receiver));

        notifier.emit(event(5));
        notifier.emit(event(7));

        tokio::time::timeout(Duration::from_secs(5), async {
            while mailer.sent.lock().unwrap().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(*mailer.sent.lock().unwrap(), vec!["rapido@mtd.co".to_string()]);
        handle.abort();
    }

    #[tokio::test]
    async fn full_queue_drops_without_error() {
        let (notifier, mut receiver) = Notifier::channel(1);
        notifier.emit(event(5));
        notifier.emit(event(5));
        assert!(receiver.try_recv().is_ok());
        assert!(receiver.try_recv().is_err());
    }
}
