// src/config.rs

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, sync::Arc, time::Duration};

use crate::{
    common::i18n::I18nStore,
    db::{
        ActivityRepository, CaseRepository, ClientRepository, NotificationRepository, PaymentRepository,
        ProspectRepository, UserRepository, WorkflowRepository,
    },
    services::{
        assignment_service::AssignmentService,
        auth::AuthService,
        case_service::CaseService,
        client_service::ClientService,
        document_service::DocumentService,
        mailer::LogMailer,
        notification_service::NotificationService,
        payment_service::PaymentService,
        prospect_service::ProspectService,
        realtime::SessionRegistry,
        user_service::UserService,
        workflow_catalog::WorkflowService,
    },
};

/// Configuração lida do ambiente (.env é carregado antes).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Exigida para criar um SUPERADMIN quando já existe um
    pub superadmin_secret: Option<String>,
    pub server_addr: String,
    pub fonts_dir: String,
    pub default_currency: String,
    pub mail_enabled: bool,
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{key} deve ser definida"))
        };
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let db_max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse().context("DB_MAX_CONNECTIONS inválido")?,
            None => 5,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            superadmin_secret: lookup("SUPERADMIN_SECRET_KEY").filter(|v| !v.is_empty()),
            server_addr: or_default("SERVER_ADDR", "0.0.0.0:3000"),
            fonts_dir: or_default("FONTS_DIR", "./fonts"),
            default_currency: or_default("DEFAULT_CURRENCY", "FCFA"),
            mail_enabled: lookup("MAIL_ENABLED").is_some_and(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes")),
            db_max_connections,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub i18n_store: &'static I18nStore,
    pub sessions: SessionRegistry,

    pub auth_service: AuthService,
    pub user_service: UserService,
    pub client_service: ClientService,
    pub assignment_service: AssignmentService,
    pub case_service: CaseService,
    pub prospect_service: ProspectService,
    pub payment_service: PaymentService,
    pub notification_service: NotificationService,
    pub workflow_service: WorkflowService,
    pub activity_repo: ActivityRepository,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = Config::from_env()?;

        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::from_pool(db_pool, config))
    }

    /// Monta repositórios e serviços sobre um pool já aberto.
    pub fn from_pool(db_pool: PgPool, config: Config) -> Self {
        // --- Repositórios ---
        let user_repo = UserRepository::new(db_pool.clone());
        let client_repo = ClientRepository::new(db_pool.clone());
        let case_repo = CaseRepository::new(db_pool.clone());
        let prospect_repo = ProspectRepository::new(db_pool.clone());
        let payment_repo = PaymentRepository::new(db_pool.clone());
        let notification_repo = NotificationRepository::new(db_pool.clone());
        let activity_repo = ActivityRepository::new(db_pool.clone());
        let workflow_repo = WorkflowRepository::new(db_pool.clone());

        // --- Serviços (de baixo para cima) ---
        let sessions = SessionRegistry::new();
        let notification_service =
            NotificationService::new(notification_repo, user_repo.clone(), Arc::new(sessions.clone()));

        let auth_service = AuthService::new(
            user_repo.clone(),
            config.jwt_secret.clone(),
            config.superadmin_secret.clone(),
        );
        let user_service = UserService::new(
            user_repo.clone(),
            client_repo.clone(),
            auth_service.clone(),
            notification_service.clone(),
            Arc::new(LogMailer::new(config.mail_enabled)),
        );
        let workflow_service = WorkflowService::new(workflow_repo);
        let payment_service = PaymentService::new(
            payment_repo,
            client_repo.clone(),
            notification_service.clone(),
            DocumentService::new(config.fonts_dir.clone()),
            config.default_currency.clone(),
        );
        let assignment_service = AssignmentService::new(
            user_repo.clone(),
            client_repo.clone(),
            case_repo.clone(),
            activity_repo.clone(),
            notification_service.clone(),
        );
        let case_service = CaseService::new(case_repo.clone(), client_repo.clone(), notification_service.clone());
        let client_service = ClientService::new(
            client_repo,
            case_repo,
            activity_repo.clone(),
            workflow_service.clone(),
            payment_service.clone(),
            assignment_service.clone(),
            user_service.clone(),
            notification_service.clone(),
        );
        let prospect_service = ProspectService::new(
            prospect_repo,
            user_repo,
            payment_service.clone(),
            client_service.clone(),
            notification_service.clone(),
        );

        Self {
            db_pool,
            config: Arc::new(config),
            i18n_store: I18nStore::global(),
            sessions,
            auth_service,
            user_service,
            client_service,
            assignment_service,
            case_service,
            prospect_service,
            payment_service,
            notification_service,
            workflow_service,
            activity_repo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_optional_vars_are_missing() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/alo"), ("JWT_SECRET", "s3cret")])
            .expect("config");

        assert_eq!(config.server_addr, "0.0.0.0:3000");
        assert_eq!(config.fonts_dir, "./fonts");
        assert_eq!(config.default_currency, "FCFA");
        assert_eq!(config.db_max_connections, 5);
        assert!(!config.mail_enabled);
        assert!(config.superadmin_secret.is_none());
    }

    #[test]
    fn required_vars_must_be_present() {
        assert!(config_from(&[("JWT_SECRET", "s3cret")]).is_err());
        assert!(config_from(&[("DATABASE_URL", "postgres://localhost/alo"), ("JWT_SECRET", " ")]).is_err());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/alo"),
            ("JWT_SECRET", "s3cret"),
            ("SUPERADMIN_SECRET_KEY", "bootstrap"),
            ("DEFAULT_CURRENCY", "EUR"),
            ("MAIL_ENABLED", "true"),
            ("DB_MAX_CONNECTIONS", "12"),
        ])
        .expect("config");

        assert_eq!(config.superadmin_secret.as_deref(), Some("bootstrap"));
        assert_eq!(config.default_currency, "EUR");
        assert!(config.mail_enabled);
        assert_eq!(config.db_max_connections, 12);
        assert!(config_from(&[
            ("DATABASE_URL", "x"),
            ("JWT_SECRET", "y"),
            ("DB_MAX_CONNECTIONS", "muitas"),
        ])
        .is_err());
    }
}
