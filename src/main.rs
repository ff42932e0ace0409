// src/main.rs

use anyhow::Context;
use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .context("Falha ao inicializar o estado da aplicação")?;

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados")?;

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Rotas públicas
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/bootstrap", post(handlers::auth::bootstrap));

    let user_routes = Router::new()
        .route("/", post(handlers::users::create_user).get(handlers::users::list_users))
        .route("/me", get(handlers::users::get_me))
        .route("/me/password", put(handlers::users::change_password))
        .route(
            "/{id}",
            get(handlers::users::get_user).delete(handlers::users::deactivate_user),
        )
        .route("/{id}/role", patch(handlers::users::update_role));

    let client_routes = Router::new()
        .route("/", post(handlers::clients::create_client).get(handlers::clients::list_clients))
        .route("/me/dashboard", get(handlers::clients::my_dashboard))
        .route("/workload", get(handlers::clients::employee_workload))
        .route("/{id}", get(handlers::clients::get_client))
        .route("/{id}/assign", put(handlers::clients::reassign_client));

    let case_routes = Router::new()
        .route("/", get(handlers::cases::list_cases))
        .route(
            "/{id}",
            get(handlers::cases::get_case).patch(handlers::cases::update_case),
        )
        .route("/{id}/progress", post(handlers::cases::record_progress));

    let prospect_routes = Router::new()
        .route("/", get(handlers::prospects::list_prospects))
        .route("/{id}", get(handlers::prospects::get_prospect))
        .route("/{id}/assign", put(handlers::prospects::assign_prospect))
        .route("/{id}/assign-consultant", post(handlers::prospects::assign_consultant))
        .route("/{id}/consultant-notes", put(handlers::prospects::consultant_notes))
        .route("/{id}/convert-to-client", post(handlers::prospects::convert_to_client));

    let payment_routes = Router::new()
        .route("/", post(handlers::payments::declare_payment).get(handlers::payments::list_payments))
        .route("/{id}", get(handlers::payments::get_payment))
        .route("/{id}/confirm", post(handlers::payments::confirm_payment))
        .route("/{id}/invoice", get(handlers::payments::payment_invoice));

    let notification_routes = Router::new()
        .route("/", get(handlers::notifications::list_notifications))
        .route("/unread-count", get(handlers::notifications::unread_count))
        .route("/read-all", put(handlers::notifications::mark_all_read))
        .route("/{id}/read", put(handlers::notifications::mark_read));

    // Tudo abaixo exige Bearer token
    let protected = Router::new()
        .nest("/users", user_routes)
        .nest("/clients", client_routes)
        .nest("/cases", case_routes)
        .nest("/prospects", prospect_routes)
        .nest("/payments", payment_routes)
        .nest("/notifications", notification_routes)
        .route("/invoices/{invoice_number}", get(handlers::payments::invoice_by_number))
        .route("/activities", get(handlers::activities::list_activities))
        .route(
            "/workflows/{country}/{visa_type}",
            get(handlers::workflows::get_workflow).put(handlers::workflows::upsert_workflow),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let api = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/contact", post(handlers::prospects::create_prospect))
        .nest("/auth", auth_routes)
        .merge(protected);

    let addr = app_state.config.server_addr.clone();
    let app = Router::new()
        .nest("/api", api)
        .route("/ws", get(handlers::realtime::live_socket))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {addr}"))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("Erro no servidor Axum")?;
    Ok(())
}
