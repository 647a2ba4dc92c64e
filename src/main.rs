//src/main.rs

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;

// Importações principais
use crate::{
    config::{AppState, Settings},
    db::UserRepository,
    services::{
        auth::AuthService,
        notifier::{NotificationWorker, Notifier, RetryPolicy},
    },
};

const NOTIFICATION_QUEUE: usize = 256;
const SESSION_PURGE_EVERY: Duration = Duration::from_secs(15 * 60);

fn spawn_session_purge(auth_service: AuthService) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_PURGE_EVERY);
        loop {
            ticker.tick().await;
            match auth_service.purge_expired_sessions().await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Sessões expiradas removidas"),
                Err(e) => tracing::warn!(error = %e, "Falha ao limpar sessões expiradas"),
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pqrs_backend=info,tower_http=info")),
        )
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let settings = Settings::from_env()?;
    let db_pool = config::connect(&settings).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados")?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Notificações: os handlers enfileiram, o worker entrega
    let mailer = config::build_mailer(&settings)?;
    let (notifier, receiver) = Notifier::channel(NOTIFICATION_QUEUE);
    let worker = NotificationWorker::new(
        Arc::new(UserRepository::new(db_pool.clone())),
        mailer.clone(),
        RetryPolicy::default(),
    );
    tokio::spawn(worker.run(receiver));

    let port = settings.port;
    let bootstrap_admin = settings.bootstrap_admin.clone();
    let app_state = AppState::from_parts(settings, db_pool, mailer, notifier);

    app_state
        .upload_service
        .ensure_dir()
        .await
        .context("Falha ao criar o diretório de anexos")?;

    if let Some(admin) = &bootstrap_admin {
        app_state.auth_service.ensure_bootstrap_admin(admin).await?;
    }

    spawn_session_purge(app_state.auth_service.clone());

    let app = routes::router(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .context("Falha ao iniciar o listener TCP")?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await.context("Erro no servidor Axum")?;

    Ok(())
}
