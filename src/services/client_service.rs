// src/services/client_service.rs

use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{case_repo::NewCase, client_repo::NewClientProfile, ActivityRepository, CaseRepository, ClientRepository},
    models::{
        auth::{Actor, User, UserRole},
        client::{
            Assignment, ClientCreatedResponse, ClientCreationOutcome, ClientDashboard, ClientProfile,
            CreateClientPayload,
        },
        payment::{NewPayment, PaymentType},
    },
    services::{
        assignment_service::AssignmentService,
        notification_service::NotificationService,
        payment_service::PaymentService,
        role_policy,
        user_service::UserService,
        workflow_catalog::{canonical_country, canonical_visa_type, WorkflowService},
    },
};

/// Dados para montar perfil + processo de um usuário CLIENT já criado.
#[derive(Debug, Clone)]
pub struct ClientProfileInput<'a> {
    pub user: &'a User,
    pub country: &'a str,
    pub visa_type: &'a str,
    pub assignment: &'a Assignment,
    pub creator_id: Uuid,
    pub first_payment: Option<Decimal>,
    pub currency: Option<&'a str>,
    pub passport_number: Option<&'a str>,
    pub address: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub prospect_id: Option<Uuid>,
}

/// Pedido completo de criação de cliente (rota /clients ou conversão de prospect).
#[derive(Debug, Clone, Default)]
pub struct OnboardRequest {
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub country: String,
    pub visa_type: String,
    pub assigned_employee_id: Option<Uuid>,
    pub use_load_balancing: bool,
    pub first_payment: Option<Decimal>,
    pub currency: Option<String>,
    pub passport_number: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub prospect_id: Option<Uuid>,
}

impl From<CreateClientPayload> for OnboardRequest {
    fn from(p: CreateClientPayload) -> Self {
        Self {
            email: p.email,
            full_name: p.full_name,
            phone: p.phone,
            country: p.country,
            visa_type: p.visa_type,
            assigned_employee_id: p.assigned_employee_id,
            use_load_balancing: p.use_load_balancing,
            first_payment: p.first_payment,
            currency: p.currency,
            passport_number: p.passport_number,
            address: p.address,
            notes: p.notes,
            prospect_id: None,
        }
    }
}

pub fn can_view_client(actor: &Actor, profile: &ClientProfile) -> bool {
    match actor.role {
        UserRole::Superadmin | UserRole::Manager => true,
        UserRole::Employee => profile.assigned_employee_id == Some(actor.id),
        UserRole::Client => profile.user_id == actor.id,
        UserRole::Consultant => false,
    }
}

/// Valor zero = sem pagamento inicial; negativo é inválido.
pub fn check_first_payment(amount: Option<Decimal>) -> Result<Option<Decimal>, AppError> {
    match amount {
        Some(a) if a < Decimal::ZERO => Err(AppError::InvalidField { field: "firstPayment", code: "must_be_positive" }),
        Some(a) if a > Decimal::ZERO => Ok(Some(a)),
        _ => Ok(None),
    }
}

#[derive(Clone)]
pub struct ClientService {
    client_repo: ClientRepository,
    case_repo: CaseRepository,
    activity_repo: ActivityRepository,
    workflow_service: WorkflowService,
    payment_service: PaymentService,
    assignment_service: AssignmentService,
    user_service: UserService,
    notification_service: NotificationService,
}

impl ClientService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client_repo: ClientRepository,
        case_repo: CaseRepository,
        activity_repo: ActivityRepository,
        workflow_service: WorkflowService,
        payment_service: PaymentService,
        assignment_service: AssignmentService,
        user_service: UserService,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            client_repo,
            case_repo,
            activity_repo,
            workflow_service,
            payment_service,
            assignment_service,
            user_service,
            notification_service,
        }
    }

    // =========================================================================
    //  CICLO DE VIDA
    // =========================================================================

    /// Passos em sequência, sem transação: se o passo k falha, os anteriores
    /// continuam gravados e o erro sobe.
    pub async fn create_client_profile(
        &self,
        input: ClientProfileInput<'_>,
    ) -> Result<ClientCreationOutcome, AppError> {
        let user = input.user;
        let country = canonical_country(input.country);
        let visa_type = canonical_visa_type(input.visa_type);

        // 1. Perfil
        let profile = self
            .client_repo
            .create_profile(&NewClientProfile {
                user_id: user.id,
                full_name: user.full_name.clone(),
                email: user.email.clone(),
                phone: user.phone.clone(),
                country: country.clone(),
                visa_type: visa_type.clone(),
                assigned_employee_id: input.assignment.assigned_employee_id,
                assigned_employee_name: input.assignment.assigned_employee_name.clone(),
                passport_number: input.passport_number.map(str::to_string),
                address: input.address.map(str::to_string),
                notes: input.notes.map(str::to_string),
                created_by: input.creator_id,
            })
            .await?;

        // 2. Template (sobrescrita > catálogo > vazio)
        let workflow = self.workflow_service.resolve(&country, &visa_type).await?;

        // 3. Processo com cópia das etapas
        let case = self
            .case_repo
            .create_case(&NewCase {
                client_id: user.id,
                client_name: user.full_name.clone(),
                assigned_employee_id: input.assignment.assigned_employee_id,
                country: country.clone(),
                visa_type: visa_type.clone(),
                workflow_steps: workflow.steps.clone(),
            })
            .await?;

        // 4. Primeiro pagamento, já confirmado
        let payment_id = match input.first_payment.filter(|a| *a > Decimal::ZERO) {
            Some(amount) => {
                let payment = self
                    .payment_service
                    .record_confirmed_entry(
                        &NewPayment {
                            client_id: Some(profile.id),
                            user_id: Some(user.id),
                            prospect_id: input.prospect_id,
                            client_name: user.full_name.clone(),
                            amount,
                            currency: input
                                .currency
                                .unwrap_or(self.payment_service.default_currency())
                                .to_string(),
                            description: format!("Premier paiement - {visa_type} ({country})"),
                            payment_method: "agence".to_string(),
                            payment_type: PaymentType::Initial,
                        },
                        input.creator_id,
                    )
                    .await?;
                Some(payment.id)
            }
            None => None,
        };

        // 5. Dashboard pronto = perfil e processo visíveis para o usuário
        let dashboard_ready = self.client_repo.find_by_user_id(user.id).await?.is_some()
            && self.case_repo.find_latest_by_client(user.id).await?.is_some();
        if !dashboard_ready {
            tracing::warn!(user_id = %user.id, "Dashboard do cliente incompleto após criação");
        }

        // 6. Log de atividade
        self.activity_repo
            .log(
                input.creator_id,
                "client_created",
                json!({
                    "clientId": profile.id,
                    "userId": user.id,
                    "caseId": case.id,
                    "country": country,
                    "visaType": visa_type,
                    "steps": workflow.steps.len(),
                    "paymentId": payment_id,
                    "prospectId": input.prospect_id,
                }),
            )
            .await?;

        Ok(ClientCreationOutcome {
            client_id: profile.id,
            case_id: case.id,
            workflow_steps: workflow.steps,
            dashboard_ready,
            payment_id,
        })
    }

    /// Usuário CLIENT + atribuição + perfil/processo + e-mail + notificações.
    pub async fn onboard_client(
        &self,
        creator: &User,
        request: &OnboardRequest,
    ) -> Result<ClientCreatedResponse, AppError> {
        let actor = Actor::from(creator);
        role_policy::ensure_can_create(&actor, UserRole::Client)?;
        let first_payment = check_first_payment(request.first_payment)?;

        // Atribuição antes de qualquer escrita: funcionário inválido = nada gravado
        let assignment = self
            .assignment_service
            .assign_client_to_employee(request.assigned_employee_id, creator, request.use_load_balancing)
            .await?;

        let account = self
            .user_service
            .provision_account(
                &request.email,
                &request.full_name,
                request.phone.as_deref(),
                UserRole::Client,
                creator.id,
                None,
            )
            .await?;

        let outcome = self
            .create_client_profile(ClientProfileInput {
                user: &account.user,
                country: &request.country,
                visa_type: &request.visa_type,
                assignment: &assignment,
                creator_id: creator.id,
                first_payment,
                currency: request.currency.as_deref(),
                passport_number: request.passport_number.as_deref(),
                address: request.address.as_deref(),
                notes: request.notes.as_deref(),
                prospect_id: request.prospect_id,
            })
            .await?;

        let email_sent = self
            .user_service
            .send_credentials(&account.user, &account.initial_password)
            .await;

        self.notification_service
            .send_creation_notifications(&account.user, creator.id, assignment.assigned_employee_id)
            .await;

        tracing::info!(
            client_id = %outcome.client_id,
            assignment = ?assignment.assignment_type,
            "Cliente criado"
        );

        Ok(ClientCreatedResponse {
            user: account.user,
            outcome,
            assignment,
            temporary_password: account.initial_password,
            email_sent,
        })
    }

    // =========================================================================
    //  LEITURAS
    // =========================================================================

    pub async fn list_clients(&self, actor: &Actor) -> Result<Vec<ClientProfile>, AppError> {
        match actor.role {
            UserRole::Superadmin | UserRole::Manager => self.client_repo.list_all().await,
            UserRole::Employee => self.client_repo.list_by_employee(actor.id).await,
            UserRole::Client | UserRole::Consultant => Err(AppError::PermissionDenied),
        }
    }

    pub async fn get_client(&self, actor: &Actor, id: Uuid) -> Result<ClientProfile, AppError> {
        let profile = self.client_repo.find_by_id(id).await?.ok_or(AppError::NotFound("client"))?;
        role_policy::ensure(can_view_client(actor, &profile))?;
        Ok(profile)
    }

    pub async fn my_dashboard(&self, actor: &Actor) -> Result<ClientDashboard, AppError> {
        let profile = self
            .client_repo
            .find_by_user_id(actor.id)
            .await?
            .ok_or(AppError::NotFound("client"))?;
        let case = self.case_repo.find_latest_by_client(actor.id).await?;

        Ok(ClientDashboard { profile, case })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::client::CaseStatus;
    use chrono::Utc;

    fn profile(user_id: Uuid, employee: Option<Uuid>) -> ClientProfile {
        ClientProfile {
            id: Uuid::new_v4(),
            user_id,
            full_name: "Aminata Sow".into(),
            email: "aminata@mail.com".into(),
            phone: None,
            country: "Canada".into(),
            visa_type: "Permis de travail".into(),
            assigned_employee_id: employee,
            assigned_employee_name: None,
            current_status: CaseStatus::Nouveau,
            current_step: 0,
            progress_percentage: 0.0,
            passport_number: None,
            address: None,
            notes: None,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn first_payment_zero_means_none_and_negative_is_invalid() {
        assert_eq!(check_first_payment(None).expect("ok"), None);
        assert_eq!(check_first_payment(Some(Decimal::ZERO)).expect("ok"), None);
        assert_eq!(
            check_first_payment(Some(Decimal::new(150_000, 0))).expect("ok"),
            Some(Decimal::new(150_000, 0))
        );
        assert!(matches!(
            check_first_payment(Some(Decimal::new(-1, 0))),
            Err(AppError::InvalidField { field: "firstPayment", .. })
        ));
    }

    #[test]
    fn client_visibility_follows_assignment_and_ownership() {
        let owner = Uuid::new_v4();
        let employee = Uuid::new_v4();
        let p = profile(owner, Some(employee));

        assert!(can_view_client(&Actor { id: owner, role: UserRole::Client }, &p));
        assert!(can_view_client(&Actor { id: employee, role: UserRole::Employee }, &p));
        assert!(can_view_client(&Actor { id: Uuid::new_v4(), role: UserRole::Manager }, &p));
        assert!(!can_view_client(&Actor { id: Uuid::new_v4(), role: UserRole::Employee }, &p));
        assert!(!can_view_client(&Actor { id: Uuid::new_v4(), role: UserRole::Client }, &p));
        assert!(!can_view_client(&Actor { id: Uuid::new_v4(), role: UserRole::Consultant }, &p));
    }

    #[test]
    fn payload_maps_into_onboard_request() {
        let payload = CreateClientPayload {
            email: "client@mail.com".into(),
            full_name: "Client".into(),
            phone: Some("+221770000000".into()),
            country: "Canada".into(),
            visa_type: "Work Permit".into(),
            assigned_employee_id: None,
            use_load_balancing: true,
            first_payment: Some(Decimal::new(150_000, 0)),
            currency: None,
            passport_number: None,
            address: None,
            notes: None,
        };

        let request = OnboardRequest::from(payload);
        assert!(request.use_load_balancing);
        assert_eq!(request.visa_type, "Work Permit");
        assert_eq!(request.prospect_id, None);
    }
}

#[cfg(all(test, feature = "db-tests"))]
mod db_tests {
    use super::*;
    use crate::{
        models::client::AssignmentType,
        services::{test_support, workflow_catalog::catalog_steps},
    };
    use sqlx::PgPool;

    fn canada_work_permit(email: &str) -> OnboardRequest {
        OnboardRequest {
            email: email.to_string(),
            full_name: "Moussa Traoré".to_string(),
            country: "Canada".to_string(),
            visa_type: "Work Permit".to_string(),
            first_payment: Some(Decimal::new(150_000, 0)),
            ..Default::default()
        }
    }

    #[sqlx::test]
    async fn employee_onboarding_copies_template_and_self_assigns(pool: PgPool) -> anyhow::Result<()> {
        let state = test_support::state(pool);
        let employee = test_support::staff(&state, UserRole::Employee, "Awa Sow").await?;

        let created = state
            .client_service
            .onboard_client(&employee, &canada_work_permit("moussa@mail.com"))
            .await?;

        assert_eq!(created.assignment.assignment_type, AssignmentType::Auto);
        assert_eq!(created.assignment.assigned_employee_id, Some(employee.id));
        assert!(created.outcome.dashboard_ready);
        assert!(created.outcome.payment_id.is_some());
        assert!(!created.email_sent);

        let profile = state
            .client_service
            .get_client(&Actor::from(&employee), created.outcome.client_id)
            .await?;
        assert_eq!(profile.assigned_employee_id, Some(employee.id));
        assert_eq!(profile.visa_type, "Permis de travail");

        let case = state
            .case_service
            .get_case(&Actor::from(&employee), created.outcome.case_id)
            .await?;
        let expected = catalog_steps("Canada", "Permis de travail").expect("template");
        assert_eq!(case.workflow_steps.0, expected);
        assert_eq!(case.total_steps(), 10);
        assert_eq!(case.current_step_index, 0);
        assert_eq!(case.client_id, created.user.id);
        Ok(())
    }

    #[sqlx::test]
    async fn manager_without_explicit_employee_keeps_the_client(pool: PgPool) -> anyhow::Result<()> {
        let state = test_support::state(pool);
        let manager = test_support::staff(&state, UserRole::Manager, "Ibrahima Fall").await?;

        let created = state
            .client_service
            .onboard_client(&manager, &canada_work_permit("khady@mail.com"))
            .await?;

        assert_eq!(created.assignment.assignment_type, AssignmentType::ManagerSelf);
        assert_eq!(created.assignment.assigned_employee_id, Some(manager.id));
        Ok(())
    }

    #[sqlx::test]
    async fn failed_last_step_leaves_earlier_writes_in_place(pool: PgPool) -> anyhow::Result<()> {
        let state = test_support::state(pool.clone());
        let employee = test_support::staff(&state, UserRole::Employee, "Awa Sow").await?;

        // O log de atividade é o último passo: sem a tabela, só ele falha
        sqlx::query("DROP TABLE user_activities").execute(&pool).await?;

        let result = state
            .client_service
            .onboard_client(&employee, &canada_work_permit("partial@mail.com"))
            .await;
        assert!(matches!(result, Err(AppError::DatabaseError(_))));

        let user: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = 'partial@mail.com'")
            .fetch_one(&pool)
            .await?;
        let profiles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients WHERE user_id = $1")
            .bind(user.0)
            .fetch_one(&pool)
            .await?;
        let cases: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cases WHERE client_id = $1")
            .bind(user.0)
            .fetch_one(&pool)
            .await?;
        let payments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payment_declarations WHERE user_id = $1")
            .bind(user.0)
            .fetch_one(&pool)
            .await?;

        assert_eq!((profiles, cases, payments), (1, 1, 1));
        Ok(())
    }
}
