// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::bootstrap,

        // --- Users ---
        handlers::users::get_me,
        handlers::users::change_password,
        handlers::users::create_user,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::update_role,
        handlers::users::deactivate_user,

        // --- Clients ---
        handlers::clients::create_client,
        handlers::clients::list_clients,
        handlers::clients::get_client,
        handlers::clients::my_dashboard,
        handlers::clients::reassign_client,
        handlers::clients::employee_workload,

        // --- Cases ---
        handlers::cases::list_cases,
        handlers::cases::get_case,
        handlers::cases::update_case,
        handlers::cases::record_progress,

        // --- Prospects ---
        handlers::prospects::create_prospect,
        handlers::prospects::list_prospects,
        handlers::prospects::get_prospect,
        handlers::prospects::assign_prospect,
        handlers::prospects::assign_consultant,
        handlers::prospects::consultant_notes,
        handlers::prospects::convert_to_client,

        // --- Payments ---
        handlers::payments::declare_payment,
        handlers::payments::list_payments,
        handlers::payments::get_payment,
        handlers::payments::confirm_payment,
        handlers::payments::payment_invoice,
        handlers::payments::invoice_by_number,

        // --- Notifications ---
        handlers::notifications::list_notifications,
        handlers::notifications::unread_count,
        handlers::notifications::mark_read,
        handlers::notifications::mark_all_read,

        // --- Activities / Workflows ---
        handlers::activities::list_activities,
        handlers::workflows::get_workflow,
        handlers::workflows::upsert_workflow,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::UserRole,
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::BootstrapSuperadminPayload,
            models::auth::CreateUserPayload,
            models::auth::UpdateRolePayload,
            models::auth::ChangePasswordPayload,
            models::auth::AuthResponse,
            models::auth::UserCreatedResponse,

            // --- Clients / Cases ---
            models::client::CaseStatus,
            models::client::WorkflowStep,
            models::client::ClientProfile,
            models::client::Case,
            models::client::AssignmentType,
            models::client::Assignment,
            models::client::EmployeeWorkload,
            models::client::CreateClientPayload,
            models::client::ReassignClientPayload,
            models::client::UpdateCasePayload,
            models::client::ClientCreationOutcome,
            models::client::ClientCreatedResponse,
            models::client::ClientDashboard,

            // --- Prospects ---
            models::prospect::ProspectStatus,
            models::prospect::Prospect,
            models::prospect::CreateProspectPayload,
            models::prospect::AssignProspectPayload,
            models::prospect::ConsultantNotesPayload,
            models::prospect::ConvertProspectPayload,
            models::prospect::ConsultantHandoffResponse,
            models::prospect::ConversionResponse,

            // --- Payments ---
            models::payment::PaymentStatus,
            models::payment::PaymentType,
            models::payment::PaymentDeclaration,
            models::payment::DeclarePaymentPayload,
            models::payment::PaymentDecision,
            models::payment::ConfirmPaymentPayload,
            models::payment::ConfirmationResponse,

            // --- Notifications ---
            models::notification::NotificationType,
            models::notification::Notification,
            models::notification::UnreadCount,
            models::notification::ActivityLog,

            // --- Workflows ---
            models::workflow::WorkflowTemplate,
            models::workflow::TemplateSource,
            models::workflow::ResolvedWorkflow,
            models::workflow::UpsertWorkflowPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação, registro e criação do SUPERADMIN"),
        (name = "Users", description = "Contas da equipe e perfil do usuário"),
        (name = "Clients", description = "Criação de clientes, atribuição e painel"),
        (name = "Cases", description = "Processos de visto e progresso sequencial"),
        (name = "Prospects", description = "Funil de prospects até a conversão"),
        (name = "Payments", description = "Declaração, confirmação em duas etapas e faturas"),
        (name = "Notifications", description = "Caixa de notificações do usuário"),
        (name = "Activities", description = "Log de atividades"),
        (name = "Workflows", description = "Modelos de etapas por país e visto")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
