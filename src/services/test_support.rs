// src/services/test_support.rs
//
// Montagem do estado real sobre o banco de teste do `#[sqlx::test]`.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::{AppState, Config},
    models::{
        auth::{User, UserRole},
        prospect::{CreateProspectPayload, Prospect},
    },
};

pub fn state(pool: PgPool) -> AppState {
    let config = Config {
        database_url: String::new(),
        jwt_secret: "test-secret".to_string(),
        superadmin_secret: None,
        server_addr: "127.0.0.1:0".to_string(),
        fonts_dir: "./fonts".to_string(),
        default_currency: "FCFA".to_string(),
        mail_enabled: false,
        db_max_connections: 1,
    };
    AppState::from_pool(pool, config)
}

pub async fn staff(state: &AppState, role: UserRole, name: &str) -> Result<User, AppError> {
    let email = format!("{}.{}@alo.test", name.to_lowercase().replace(' ', "."), Uuid::new_v4().simple());
    state
        .auth_service
        .create_account(&email, "Senha-Forte-1", name, None, role, None)
        .await
}

pub async fn prospect(state: &AppState) -> Result<Prospect, AppError> {
    state
        .prospect_service
        .create(&CreateProspectPayload {
            name: "Aminata Diallo".into(),
            email: format!("aminata.{}@mail.com", Uuid::new_v4().simple()),
            phone: Some("+221770000001".into()),
            country: Some("France".into()),
            visa_type: Some("Visa Étudiant".into()),
            budget_range: Some("3000-5000€".into()),
            urgency_level: Some("normal".into()),
            message: "Je souhaite étudier à Lyon à la rentrée prochaine.".into(),
        })
        .await
}
