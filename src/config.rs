// src/config.rs

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use axum_extra::extract::cookie::SameSite;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{SessionRepository, TicketRepository, UserRepository},
    services::{
        auth::AuthService,
        notifier::{mailer::DisabledMailer, Mailer, Notifier, SmtpMailer},
        report_service::ReportService,
        ticket_service::TicketService,
        upload_service::UploadService,
        user_service::UserService,
    },
};

pub const SESSION_COOKIE: &str = "pqrs.sid";
pub const SESSION_TTL_SECS: i64 = 60 * 60;

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

// Tudo o que vem do ambiente, lido uma vez na inicialização
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub production: bool,
    pub cookie_same_site: SameSite,
    pub cors_origins: Vec<String>,
    pub uploads_cross_origin: bool,
    pub upload_dir: PathBuf,
    pub smtp: Option<SmtpSettings>,
    pub signature_image_path: PathBuf,
    pub organization_name: String,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("{key} inválido: '{raw}'")),
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Monta as configurações a partir de uma função de busca (testável sem mexer no ambiente).
    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // vazio conta como ausente
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").context("DATABASE_URL deve ser definida")?;

        let cookie_same_site = match get("COOKIE_SAMESITE").map(|v| v.to_lowercase()).as_deref() {
            None | Some("lax") => SameSite::Lax,
            Some("strict") => SameSite::Strict,
            Some("none") => SameSite::None,
            Some(other) => return Err(anyhow!("COOKIE_SAMESITE inválido: '{other}'")),
        };

        let cors_origins = get("CORS_ORIGIN")
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().trim_end_matches('/').to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let smtp = match get("SMTP_HOST") {
            None => None,
            Some(host) => {
                let secure = get("SMTP_SECURE").is_some_and(|v| v.eq_ignore_ascii_case("true"));
                let default_port = if secure { 465 } else { 587 };
                Some(SmtpSettings {
                    host,
                    port: parse_or(get("SMTP_PORT"), "SMTP_PORT", default_port)?,
                    secure,
                    user: get("SMTP_USER").context("SMTP_USER deve ser definido junto com SMTP_HOST")?,
                    password: get("SMTP_PASS").unwrap_or_default(),
                })
            }
        };

        let bootstrap_admin = match (get("BOOTSTRAP_ADMIN_USER"), get("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(BootstrapAdmin { username, password }),
            _ => None,
        };

        Ok(Self {
            database_url,
            port: parse_or(get("PORT"), "PORT", 1000)?,
            db_max_connections: parse_or(get("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 10)?,
            production: get("APP_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production")),
            cookie_same_site,
            cors_origins,
            uploads_cross_origin: get("UPLOADS_CROSS_ORIGIN").as_deref() == Some("1"),
            upload_dir: get("UPLOAD_DIR").unwrap_or_else(|| "./uploads".into()).into(),
            smtp,
            signature_image_path: get("SIGNATURE_IMAGE_PATH")
                .unwrap_or_else(|| "./assets/firma-pqrs.jpg".into())
                .into(),
            organization_name: get("ORGANIZATION_NAME").unwrap_or_else(|| "MTD".into()),
            bootstrap_admin,
        })
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(SESSION_TTL_SECS)
    }

    pub fn origin_allowed(&self, origin: &str) -> bool {
        let origin = origin.trim_end_matches('/');
        self.cors_origins.iter().any(|allowed| allowed == origin)
    }
}

pub async fn connect(settings: &Settings) -> anyhow::Result<PgPool> {
    // Conecta ao banco de dados, usando '?' para propagar erros
    let pool = PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&settings.database_url)
        .await
        .context("Falha ao conectar ao banco de dados")?;

    tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
    Ok(pool)
}

pub fn build_mailer(settings: &Settings) -> anyhow::Result<Arc<dyn Mailer>> {
    match &settings.smtp {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, port = smtp.port, "✅ SMTP configurado");
            Ok(Arc::new(SmtpMailer::new(smtp)?))
        }
        None => {
            tracing::warn!("SMTP_HOST não definido: e-mails não serão enviados");
            Ok(Arc::new(DisabledMailer))
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: Arc<Settings>,
    pub i18n_store: Arc<I18nStore>,
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub ticket_service: TicketService,
    pub report_service: ReportService,
    pub upload_service: UploadService,
}

impl AppState {
    // --- Monta o gráfico de dependências ---
    pub fn from_parts(settings: Settings, db_pool: PgPool, mailer: Arc<dyn Mailer>, notifier: Notifier) -> Self {
        let settings = Arc::new(settings);

        let user_repo = UserRepository::new(db_pool.clone());
        let session_repo = SessionRepository::new(db_pool.clone());
        let ticket_repo = TicketRepository::new(db_pool.clone());

        let auth_service = AuthService::new(user_repo.clone(), session_repo, settings.session_ttl());
        let user_service = UserService::new(user_repo.clone());
        let upload_service = UploadService::new(settings.upload_dir.clone(), ticket_repo.clone());
        let ticket_service = TicketService::new(
            ticket_repo.clone(),
            user_repo.clone(),
            upload_service.clone(),
            notifier,
            mailer,
            settings.clone(),
        );
        let report_service = ReportService::new(ticket_repo, user_repo);

        Self {
            db_pool,
            settings,
            i18n_store: Arc::new(I18nStore::new()),
            auth_service,
            user_service,
            ticket_service,
            report_service,
            upload_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> anyhow::Result<Settings> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let s = settings(&[("DATABASE_URL", "postgres://localhost/pqrs")]).unwrap();
        assert_eq!(s.port, 1000);
        assert_eq!(s.db_max_connections, 10);
        assert!(!s.production);
        assert_eq!(s.cookie_same_site, SameSite::Lax);
        assert!(s.cors_origins.is_empty());
        assert_eq!(s.upload_dir, PathBuf::from("./uploads"));
        assert_eq!(s.organization_name, "MTD");
        assert!(s.smtp.is_none());
        assert!(s.bootstrap_admin.is_none());
    }

    #[test]
    fn database_url_is_required() {
        assert!(settings(&[]).is_err());
        assert!(settings(&[("DATABASE_URL", "  ")]).is_err());
    }

    #[test]
    fn parses_cors_cookie_and_smtp() {
        let s = settings(&[
            ("DATABASE_URL", "postgres://db/pqrs"),
            ("APP_ENV", "production"),
            ("COOKIE_SAMESITE", "None"),
            ("CORS_ORIGIN", "https://pqrs.mtd.co/, http://localhost:5173"),
            ("SMTP_HOST", "smtp.mtd.co"),
            ("SMTP_SECURE", "true"),
            ("SMTP_USER", "pqrs@mtd.co"),
        ])
        .unwrap();
        assert!(s.production);
        assert_eq!(s.cookie_same_site, SameSite::None);
        assert!(s.origin_allowed("https://pqrs.mtd.co"));
        assert!(s.origin_allowed("http://localhost:5173/"));
        assert!(!s.origin_allowed("https://evil.example"));
        let smtp = s.smtp.unwrap();
        assert_eq!(smtp.port, 465);
        assert!(smtp.secure);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(settings(&[("DATABASE_URL", "x"), ("PORT", "abc")]).is_err());
        assert!(settings(&[("DATABASE_URL", "x"), ("COOKIE_SAMESITE", "sometimes")]).is_err());
        assert!(settings(&[("DATABASE_URL", "x"), ("SMTP_HOST", "smtp")]).is_err());
    }
}
