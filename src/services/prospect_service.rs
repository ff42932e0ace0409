// src/services/prospect_service.rs

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ProspectRepository, UserRepository},
    models::{
        auth::{Actor, User, UserRole},
        payment::{NewPayment, PaymentType},
        prospect::{
            AssignProspectPayload, ConsultantHandoffResponse, ConsultantNotesPayload, ConversionResponse,
            ConvertProspectPayload, CreateProspectPayload, Prospect, ProspectStatus,
        },
    },
    services::{
        client_service::{ClientService, OnboardRequest},
        notification_service::NotificationService,
        payment_service::PaymentService,
        role_policy,
        workflow_catalog::{canonical_country, normalize_key},
    },
};

/// Taxa fixa cobrada na passagem para o consultor.
pub const CONSULTATION_FEE: i64 = 50_000;

// Países com processo considerado simples (pontuação extra)
const EASY_VISA_COUNTRIES: &[&str] = &["Canada", "France", "Belgique", "Portugal", "Allemagne"];

// =============================================================================
//  REGRAS PURAS
// =============================================================================

/// Probabilidade de conversão (0-100) calculada na entrada do formulário.
pub fn score_prospect(payload: &CreateProspectPayload) -> i32 {
    let mut score = 50;

    if let Some(budget) = payload.budget_range.as_deref() {
        let budget: String = budget
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| if matches!(c, '–' | '—') { '-' } else { c })
            .collect();
        if budget.contains("5000+") {
            score += 30;
        } else if budget.contains("3000-5000") {
            score += 20;
        } else if budget.contains("1000-3000") {
            score += 10;
        }
    }

    match payload.urgency_level.as_deref().map(normalize_key).as_deref() {
        Some("urgent") => score += 20,
        Some("normal") => score += 10,
        _ => {}
    }

    if payload.country.as_deref().is_some_and(is_easy_visa_country) {
        score += 15;
    }

    if payload.message.chars().count() > 200 {
        score += 10;
    }

    if payload.phone.is_some() && payload.visa_type.is_some() {
        score += 5;
    }

    score.min(100)
}

pub fn is_easy_visa_country(country: &str) -> bool {
    let key = normalize_key(&canonical_country(country));
    EASY_VISA_COUNTRIES.iter().any(|c| normalize_key(c) == key)
}

pub fn can_view_prospect(actor: &Actor, prospect: &Prospect) -> bool {
    match actor.role {
        UserRole::Superadmin => true,
        UserRole::Manager | UserRole::Employee => prospect.assigned_to == Some(actor.id),
        UserRole::Consultant => prospect.status == ProspectStatus::Paiement50k,
        UserRole::Client => false,
    }
}

/// Quem pode mandar o prospect para o consultor.
pub fn can_hand_off(actor: &Actor, prospect: &Prospect) -> bool {
    role_policy::can_assign_prospects(actor.role) || prospect.assigned_to == Some(actor.id)
}

pub fn can_write_consultant_notes(actor: &Actor, prospect: &Prospect) -> bool {
    matches!(actor.role, UserRole::Consultant | UserRole::Manager | UserRole::Superadmin)
        || prospect.assigned_to == Some(actor.id)
}

/// `assigne` só na primeira atribuição; reatribuir não volta o status.
pub fn status_after_assignment(current: ProspectStatus) -> ProspectStatus {
    match current {
        ProspectStatus::Nouveau => ProspectStatus::Assigne,
        other => other,
    }
}

pub fn ensure_open(prospect: &Prospect) -> Result<(), AppError> {
    if prospect.status.is_terminal() {
        return Err(AppError::ProspectAlreadyConverted);
    }
    Ok(())
}

/// A taxa é cobrada uma vez só: apenas antes de "paiement_50k".
pub fn ensure_fee_unpaid(prospect: &Prospect) -> Result<(), AppError> {
    ensure_open(prospect)?;
    match prospect.status {
        ProspectStatus::Nouveau | ProspectStatus::Assigne => Ok(()),
        _ => Err(AppError::InvalidField { field: "status", code: "consultation_already_paid" }),
    }
}

/// O parecer só vem depois da taxa paga.
pub fn ensure_fee_paid(prospect: &Prospect) -> Result<(), AppError> {
    ensure_open(prospect)?;
    match prospect.status {
        ProspectStatus::Paiement50k | ProspectStatus::EnConsultation => Ok(()),
        _ => Err(AppError::InvalidField { field: "status", code: "consultation_not_paid" }),
    }
}

// =============================================================================
//  SERVIÇO
// =============================================================================

#[derive(Clone)]
pub struct ProspectService {
    repo: ProspectRepository,
    user_repo: UserRepository,
    payment_service: PaymentService,
    client_service: ClientService,
    notification_service: NotificationService,
}

impl ProspectService {
    pub fn new(
        repo: ProspectRepository,
        user_repo: UserRepository,
        payment_service: PaymentService,
        client_service: ClientService,
        notification_service: NotificationService,
    ) -> Self {
        Self { repo, user_repo, payment_service, client_service, notification_service }
    }

    async fn load(&self, id: Uuid) -> Result<Prospect, AppError> {
        self.repo.find_by_id(id).await?.ok_or(AppError::NotFound("prospect"))
    }

    /// Formulário público (sem autenticação).
    pub async fn create(&self, payload: &CreateProspectPayload) -> Result<Prospect, AppError> {
        let score = score_prospect(payload);
        let prospect = self.repo.create(payload, score).await?;

        tracing::info!(prospect_id = %prospect.id, score, "Novo prospect recebido");
        Ok(prospect)
    }

    pub async fn list(&self, actor: &Actor) -> Result<Vec<Prospect>, AppError> {
        match actor.role {
            UserRole::Superadmin => self.repo.list_all().await,
            UserRole::Manager | UserRole::Employee => self.repo.list_by_assignee(actor.id).await,
            UserRole::Consultant => self.repo.list_by_status(ProspectStatus::Paiement50k).await,
            UserRole::Client => Err(AppError::PermissionDenied),
        }
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<Prospect, AppError> {
        role_policy::ensure(actor.role != UserRole::Client)?;
        let prospect = self.load(id).await?;
        role_policy::ensure(can_view_prospect(actor, &prospect))?;
        Ok(prospect)
    }

    pub async fn assign(
        &self,
        actor: &Actor,
        id: Uuid,
        payload: &AssignProspectPayload,
    ) -> Result<Prospect, AppError> {
        role_policy::ensure(role_policy::can_assign_prospects(actor.role))?;

        let prospect = self.load(id).await?;
        ensure_open(&prospect)?;

        let assignee = self
            .user_repo
            .find_by_id(payload.assigned_to)
            .await?
            .filter(|u| u.is_active && matches!(u.role, UserRole::Employee | UserRole::Manager))
            .ok_or(AppError::NotFound("employee"))?;

        let updated = self
            .repo
            .assign(
                id,
                assignee.id,
                &assignee.full_name,
                status_after_assignment(prospect.status),
                payload.notes.as_deref(),
            )
            .await?
            .ok_or(AppError::ProspectAlreadyConverted)?;

        tracing::info!(prospect_id = %id, assignee = %assignee.id, "Prospect atribuído");
        self.notification_service.notify_prospect_assigned(&updated).await;
        Ok(updated)
    }

    /// Passa para o consultor e lança a taxa de consulta já confirmada.
    pub async fn assign_consultant(
        &self,
        actor: &Actor,
        id: Uuid,
    ) -> Result<ConsultantHandoffResponse, AppError> {
        let prospect = self.load(id).await?;
        role_policy::ensure(can_hand_off(actor, &prospect))?;
        ensure_fee_unpaid(&prospect)?;

        // Outra requisição pode ter passado na frente
        let Some(updated) = self.repo.open_consultation(id).await? else {
            return Err(ensure_fee_unpaid(&self.load(id).await?)
                .err()
                .unwrap_or(AppError::InvalidField { field: "status", code: "consultation_already_paid" }));
        };

        let payment = self
            .payment_service
            .record_confirmed_entry(
                &NewPayment {
                    client_id: None,
                    user_id: None,
                    prospect_id: Some(id),
                    client_name: updated.name.clone(),
                    amount: Decimal::from(CONSULTATION_FEE),
                    currency: self.payment_service.default_currency().to_string(),
                    description: "Frais de consultation".to_string(),
                    payment_method: "agence".to_string(),
                    payment_type: PaymentType::Consultation,
                },
                actor.id,
            )
            .await?;

        let invoice_number = payment.invoice_number.clone().unwrap_or_default();
        self.notification_service
            .notify_consultant_handoff(&updated, &invoice_number)
            .await;

        Ok(ConsultantHandoffResponse { prospect: updated, payment_id: payment.id, invoice_number })
    }

    pub async fn consultant_notes(
        &self,
        actor: &Actor,
        id: Uuid,
        payload: &ConsultantNotesPayload,
    ) -> Result<Prospect, AppError> {
        let prospect = self.load(id).await?;
        role_policy::ensure(can_write_consultant_notes(actor, &prospect))?;
        ensure_fee_paid(&prospect)?;

        let saved = self
            .repo
            .save_consultant_notes(
                id,
                &payload.consultant_notes,
                payload.potential_client,
                payload.potential_level.as_deref(),
            )
            .await?;
        let Some(updated) = saved else {
            return Err(ensure_fee_paid(&self.load(id).await?)
                .err()
                .unwrap_or(AppError::InvalidField { field: "status", code: "consultation_not_paid" }));
        };

        self.notification_service.notify_consultant_notes(&updated, actor.id).await;
        Ok(updated)
    }

    /// Cria o cliente a partir do prospect e fecha o funil.
    pub async fn convert(
        &self,
        actor: &User,
        id: Uuid,
        payload: &ConvertProspectPayload,
    ) -> Result<ConversionResponse, AppError> {
        role_policy::ensure_can_create(&Actor::from(actor), UserRole::Client)?;

        let prospect = self.load(id).await?;
        ensure_open(&prospect)?;

        let request = OnboardRequest {
            email: prospect.email.clone(),
            full_name: prospect.name.clone(),
            phone: prospect.phone.clone(),
            country: payload.country.clone(),
            visa_type: payload.visa_type.clone(),
            assigned_employee_id: payload.assigned_employee_id.or(prospect.assigned_to),
            use_load_balancing: false,
            first_payment: Some(payload.first_payment_amount),
            currency: payload.currency.clone(),
            passport_number: None,
            address: None,
            notes: prospect.consultant_notes.clone().or_else(|| prospect.notes.clone()),
            prospect_id: Some(id),
        };
        let created = self.client_service.onboard_client(actor, &request).await?;

        let converted = self
            .repo
            .mark_converted(id, created.user.id)
            .await?
            .ok_or(AppError::ProspectAlreadyConverted)?;

        tracing::info!(prospect_id = %id, user_id = %created.user.id, "Prospect convertido em cliente");
        self.notification_service
            .notify_prospect_converted(&converted, actor.id)
            .await;

        Ok(ConversionResponse {
            client_id: created.outcome.client_id,
            user_id: created.user.id,
            case_id: created.outcome.case_id,
            payment_id: created.outcome.payment_id,
            temporary_password: created.temporary_password,
            email_sent: created.email_sent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn payload() -> CreateProspectPayload {
        CreateProspectPayload {
            name: "Fatou Ndiaye".into(),
            email: "fatou@mail.com".into(),
            phone: None,
            country: None,
            visa_type: None,
            budget_range: None,
            urgency_level: None,
            message: "Bonjour, je souhaite immigrer.".into(),
        }
    }

    fn prospect(status: ProspectStatus, assigned_to: Option<Uuid>) -> Prospect {
        Prospect {
            id: Uuid::new_v4(),
            name: "Fatou Ndiaye".into(),
            email: "fatou@mail.com".into(),
            phone: None,
            country: Some("Canada".into()),
            visa_type: None,
            budget_range: None,
            urgency_level: None,
            message: "Bonjour".into(),
            status,
            assigned_to,
            assigned_to_name: None,
            conversion_probability: 50,
            notes: None,
            consultant_notes: None,
            potential_client: None,
            potential_level: None,
            client_user_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn base_score_is_fifty() {
        assert_eq!(score_prospect(&payload()), 50);
    }

    #[test]
    fn strong_lead_is_capped_at_hundred() {
        let mut p = payload();
        p.budget_range = Some("5000+€".into());
        p.urgency_level = Some("Urgent".into());
        p.country = Some("France".into());
        p.phone = Some("+221770000000".into());
        p.visa_type = Some("Visa Étudiant".into());
        p.message = "x".repeat(250);

        // 50 + 30 + 20 + 15 + 10 + 5
        assert_eq!(score_prospect(&p), 100);
    }

    #[test]
    fn each_criterion_adds_its_weight() {
        let mut p = payload();
        p.budget_range = Some("3000-5000€".into());
        assert_eq!(score_prospect(&p), 70);

        p.budget_range = Some("1000–3000€".into());
        assert_eq!(score_prospect(&p), 60);

        p.urgency_level = Some("normal".into());
        assert_eq!(score_prospect(&p), 70);

        p.country = Some("Germany".into());
        assert_eq!(score_prospect(&p), 85);

        p.phone = Some("+33600000000".into());
        assert_eq!(score_prospect(&p), 85);
        p.visa_type = Some("Visa Étudiant".into());
        assert_eq!(score_prospect(&p), 90);
    }

    #[test]
    fn message_must_exceed_two_hundred_chars() {
        let mut p = payload();
        p.message = "é".repeat(200);
        assert_eq!(score_prospect(&p), 50);
        p.message = "é".repeat(201);
        assert_eq!(score_prospect(&p), 60);
    }

    #[test]
    fn easy_visa_countries_accept_aliases() {
        for country in ["Canada", "france", "Belgium", "Belgique", "Portugal", "Allemagne", "germany"] {
            assert!(is_easy_visa_country(country), "{country}");
        }
        assert!(!is_easy_visa_country("Japon"));
    }

    #[test]
    fn first_assignment_moves_to_assigne_only_from_nouveau() {
        assert_eq!(status_after_assignment(ProspectStatus::Nouveau), ProspectStatus::Assigne);
        assert_eq!(status_after_assignment(ProspectStatus::Assigne), ProspectStatus::Assigne);
        assert_eq!(status_after_assignment(ProspectStatus::Paiement50k), ProspectStatus::Paiement50k);
    }

    #[test]
    fn consultant_notes_wait_for_the_consultation_fee() {
        for status in [ProspectStatus::Nouveau, ProspectStatus::Assigne] {
            assert!(matches!(
                ensure_fee_paid(&prospect(status, None)),
                Err(AppError::InvalidField { field: "status", code: "consultation_not_paid" })
            ));
        }
        assert!(ensure_fee_paid(&prospect(ProspectStatus::Paiement50k, None)).is_ok());
        assert!(ensure_fee_paid(&prospect(ProspectStatus::EnConsultation, None)).is_ok());
        assert!(matches!(
            ensure_fee_paid(&prospect(ProspectStatus::ConvertiClient, None)),
            Err(AppError::ProspectAlreadyConverted)
        ));
    }

    #[test]
    fn consultation_fee_is_charged_once() {
        assert!(ensure_fee_unpaid(&prospect(ProspectStatus::Nouveau, None)).is_ok());
        assert!(ensure_fee_unpaid(&prospect(ProspectStatus::Assigne, None)).is_ok());
        for status in [ProspectStatus::Paiement50k, ProspectStatus::EnConsultation] {
            assert!(matches!(
                ensure_fee_unpaid(&prospect(status, None)),
                Err(AppError::InvalidField { field: "status", code: "consultation_already_paid" })
            ));
        }
        assert!(matches!(
            ensure_fee_unpaid(&prospect(ProspectStatus::ConvertiClient, None)),
            Err(AppError::ProspectAlreadyConverted)
        ));
    }

    #[test]
    fn converted_prospect_is_closed() {
        assert!(ensure_open(&prospect(ProspectStatus::EnConsultation, None)).is_ok());
        assert!(matches!(
            ensure_open(&prospect(ProspectStatus::ConvertiClient, None)),
            Err(AppError::ProspectAlreadyConverted)
        ));
    }

    #[test]
    fn visibility_by_role() {
        let employee = Uuid::new_v4();
        let assigned = prospect(ProspectStatus::Assigne, Some(employee));
        let paid = prospect(ProspectStatus::Paiement50k, None);

        let superadmin = Actor { id: Uuid::new_v4(), role: UserRole::Superadmin };
        let consultant = Actor { id: Uuid::new_v4(), role: UserRole::Consultant };
        let client = Actor { id: Uuid::new_v4(), role: UserRole::Client };

        assert!(can_view_prospect(&superadmin, &assigned));
        assert!(can_view_prospect(&Actor { id: employee, role: UserRole::Employee }, &assigned));
        assert!(!can_view_prospect(&Actor { id: Uuid::new_v4(), role: UserRole::Manager }, &assigned));
        assert!(!can_view_prospect(&consultant, &assigned));
        assert!(can_view_prospect(&consultant, &paid));
        assert!(!can_view_prospect(&client, &paid));
    }

    #[test]
    fn hand_off_and_notes_permissions() {
        let employee = Uuid::new_v4();
        let p = prospect(ProspectStatus::Assigne, Some(employee));

        assert!(can_hand_off(&Actor { id: employee, role: UserRole::Employee }, &p));
        assert!(can_hand_off(&Actor { id: Uuid::new_v4(), role: UserRole::Manager }, &p));
        assert!(!can_hand_off(&Actor { id: Uuid::new_v4(), role: UserRole::Employee }, &p));
        assert!(!can_hand_off(&Actor { id: Uuid::new_v4(), role: UserRole::Consultant }, &p));

        assert!(can_write_consultant_notes(&Actor { id: Uuid::new_v4(), role: UserRole::Consultant }, &p));
        assert!(can_write_consultant_notes(&Actor { id: employee, role: UserRole::Employee }, &p));
        assert!(!can_write_consultant_notes(&Actor { id: Uuid::new_v4(), role: UserRole::Client }, &p));
    }
}

#[cfg(all(test, feature = "db-tests"))]
mod db_tests {
    use super::*;
    use crate::services::test_support;
    use sqlx::PgPool;

    async fn consultation_payments(pool: &PgPool, prospect_id: Uuid) -> sqlx::Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM payment_declarations
             WHERE prospect_id = $1 AND payment_type = 'consultation' AND amount = 50000
               AND status = 'confirmed' AND invoice_number IS NOT NULL",
        )
        .bind(prospect_id)
        .fetch_one(pool)
        .await
    }

    #[sqlx::test]
    async fn hand_off_charges_the_consultation_fee_once(pool: PgPool) -> anyhow::Result<()> {
        let state = test_support::state(pool.clone());
        let manager = test_support::staff(&state, UserRole::Manager, "Ibrahima Fall").await?;
        let employee = test_support::staff(&state, UserRole::Employee, "Awa Sow").await?;
        let lead = test_support::prospect(&state).await?;

        let assigned = state
            .prospect_service
            .assign(&Actor::from(&manager), lead.id, &AssignProspectPayload { assigned_to: employee.id, notes: None })
            .await?;
        assert_eq!(assigned.status, ProspectStatus::Assigne);

        let handoff = state
            .prospect_service
            .assign_consultant(&Actor::from(&employee), lead.id)
            .await?;
        assert_eq!(handoff.prospect.status, ProspectStatus::Paiement50k);
        assert!(!handoff.invoice_number.is_empty());
        assert_eq!(consultation_payments(&pool, lead.id).await?, 1);

        let again = state
            .prospect_service
            .assign_consultant(&Actor::from(&manager), lead.id)
            .await;
        assert!(matches!(
            again,
            Err(AppError::InvalidField { field: "status", code: "consultation_already_paid" })
        ));
        assert_eq!(consultation_payments(&pool, lead.id).await?, 1);
        Ok(())
    }

    #[sqlx::test]
    async fn consultant_notes_require_the_paid_consultation(pool: PgPool) -> anyhow::Result<()> {
        let state = test_support::state(pool.clone());
        let manager = test_support::staff(&state, UserRole::Manager, "Ibrahima Fall").await?;
        let consultant = test_support::staff(&state, UserRole::Consultant, "Rokhaya Ndiaye").await?;
        let lead = test_support::prospect(&state).await?;
        let notes = ConsultantNotesPayload {
            consultant_notes: "Dossier solide, admission probable.".into(),
            potential_client: true,
            potential_level: Some("eleve".into()),
        };

        let early = state
            .prospect_service
            .consultant_notes(&Actor::from(&consultant), lead.id, &notes)
            .await;
        assert!(matches!(
            early,
            Err(AppError::InvalidField { field: "status", code: "consultation_not_paid" })
        ));
        let status: ProspectStatus = sqlx::query_scalar("SELECT status FROM contact_messages WHERE id = $1")
            .bind(lead.id)
            .fetch_one(&pool)
            .await?;
        assert_eq!(status, ProspectStatus::Nouveau);

        // Taxa paga: o parecer entra e a taxa continua única
        state.prospect_service.assign_consultant(&Actor::from(&manager), lead.id).await?;
        let noted = state
            .prospect_service
            .consultant_notes(&Actor::from(&consultant), lead.id, &notes)
            .await?;
        assert_eq!(noted.status, ProspectStatus::EnConsultation);
        assert_eq!(noted.potential_client, Some(true));
        assert_eq!(consultation_payments(&pool, lead.id).await?, 1);
        Ok(())
    }

    #[sqlx::test]
    async fn converted_prospect_rejects_every_transition(pool: PgPool) -> anyhow::Result<()> {
        let state = test_support::state(pool.clone());
        let manager = test_support::staff(&state, UserRole::Manager, "Ibrahima Fall").await?;
        let employee = test_support::staff(&state, UserRole::Employee, "Awa Sow").await?;
        let actor = Actor::from(&manager);
        let lead = test_support::prospect(&state).await?;

        state
            .prospect_service
            .assign(&actor, lead.id, &AssignProspectPayload { assigned_to: employee.id, notes: None })
            .await?;
        state.prospect_service.assign_consultant(&actor, lead.id).await?;

        let conversion = ConvertProspectPayload {
            first_payment_amount: Decimal::new(250_000, 0),
            country: "France".into(),
            visa_type: "Student Visa".into(),
            currency: None,
            assigned_employee_id: None,
        };
        let converted = state.prospect_service.convert(&manager, lead.id, &conversion).await?;
        assert!(converted.payment_id.is_some());

        let client = state.client_service.get_client(&actor, converted.client_id).await?;
        assert_eq!(client.assigned_employee_id, Some(employee.id));
        assert_eq!(client.visa_type, "Visa Étudiant");

        let status: ProspectStatus = sqlx::query_scalar("SELECT status FROM contact_messages WHERE id = $1")
            .bind(lead.id)
            .fetch_one(&pool)
            .await?;
        assert_eq!(status, ProspectStatus::ConvertiClient);

        let closed = |r: &Result<_, AppError>| matches!(r, Err(AppError::ProspectAlreadyConverted));
        let reassign = state
            .prospect_service
            .assign(&actor, lead.id, &AssignProspectPayload { assigned_to: employee.id, notes: None })
            .await;
        assert!(closed(&reassign.map(|_| ())));
        let handoff = state.prospect_service.assign_consultant(&actor, lead.id).await;
        assert!(closed(&handoff.map(|_| ())));
        let notes = state
            .prospect_service
            .consultant_notes(
                &actor,
                lead.id,
                &ConsultantNotesPayload {
                    consultant_notes: "Tarde demais".into(),
                    potential_client: false,
                    potential_level: None,
                },
            )
            .await;
        assert!(closed(&notes.map(|_| ())));
        let twice = state.prospect_service.convert(&manager, lead.id, &conversion).await;
        assert!(closed(&twice.map(|_| ())));
        Ok(())
    }
}
