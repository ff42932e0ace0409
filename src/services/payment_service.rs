// src/services/payment_service.rs

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ClientRepository, PaymentRepository},
    models::{
        auth::{Actor, User, UserRole},
        payment::{
            ConfirmPaymentPayload, ConfirmationResponse, DeclarePaymentPayload, NewPayment,
            PaymentDeclaration, PaymentDecision, PaymentStatus, PaymentType,
        },
    },
    services::{
        document_service::DocumentService, notification_service::NotificationService, role_policy,
    },
};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LEN: usize = 4;

// =============================================================================
//  REGRAS PURAS
// =============================================================================

/// `ALO-<AAAAMMDD>-<8 hex maiúsculos>`
pub fn generate_invoice_number(now: DateTime<Utc>) -> String {
    let suffix = rand::random::<u32>();
    format!("ALO-{}-{:08X}", now.format("%Y%m%d"), suffix)
}

pub fn generate_confirmation_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// O que a chamada de confirmação deve fazer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationPlan {
    /// Primeira etapa: gerar e guardar o código, status inalterado
    IssueCode,
    Finalize { code: String },
    Reject { reason: String },
}

pub fn plan_confirmation(
    status: PaymentStatus,
    stored_code: Option<&str>,
    payload: &ConfirmPaymentPayload,
) -> Result<ConfirmationPlan, AppError> {
    if status.is_terminal() {
        return Err(AppError::PaymentAlreadyProcessed);
    }

    match payload.action {
        PaymentDecision::Rejected => {
            let reason = payload
                .rejection_reason
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .ok_or(AppError::InvalidField { field: "rejectionReason", code: "required" })?;
            Ok(ConfirmationPlan::Reject { reason: reason.to_string() })
        }
        PaymentDecision::Confirmed => {
            let Some(given) = payload.confirmation_code.as_deref().map(str::trim) else {
                return Ok(ConfirmationPlan::IssueCode);
            };
            let given = given.to_uppercase();
            match stored_code {
                Some(expected) if expected == given => Ok(ConfirmationPlan::Finalize { code: given }),
                _ => Err(AppError::ConfirmationCodeMismatch),
            }
        }
    }
}

/// Dono, qualquer MANAGER/SUPERADMIN ou o funcionário responsável pelo dono.
pub fn can_access_payment(actor: &Actor, owner_id: Option<Uuid>, assigned_employee_id: Option<Uuid>) -> bool {
    match actor.role {
        UserRole::Superadmin | UserRole::Manager => true,
        UserRole::Client => owner_id == Some(actor.id),
        UserRole::Employee => assigned_employee_id == Some(actor.id),
        UserRole::Consultant => false,
    }
}

// =============================================================================
//  SERVIÇO
// =============================================================================

#[derive(Clone)]
pub struct PaymentService {
    repo: PaymentRepository,
    client_repo: ClientRepository,
    notification_service: NotificationService,
    document_service: DocumentService,
    default_currency: String,
}

impl PaymentService {
    pub fn new(
        repo: PaymentRepository,
        client_repo: ClientRepository,
        notification_service: NotificationService,
        document_service: DocumentService,
        default_currency: String,
    ) -> Self {
        Self { repo, client_repo, notification_service, document_service, default_currency }
    }

    pub fn default_currency(&self) -> &str {
        &self.default_currency
    }

    pub async fn declare(
        &self,
        client: &User,
        payload: &DeclarePaymentPayload,
    ) -> Result<PaymentDeclaration, AppError> {
        role_policy::ensure(client.role == UserRole::Client)?;
        if payload.amount <= Decimal::ZERO {
            return Err(AppError::InvalidField { field: "amount", code: "must_be_positive" });
        }

        let profile = self.client_repo.find_by_user_id(client.id).await?;
        let payment = self
            .repo
            .create_pending(&NewPayment {
                client_id: profile.map(|p| p.id),
                user_id: Some(client.id),
                prospect_id: None,
                client_name: client.full_name.clone(),
                amount: payload.amount,
                currency: payload.currency.clone().unwrap_or_else(|| self.default_currency.clone()),
                description: payload.description.clone(),
                payment_method: payload.payment_method.clone(),
                payment_type: PaymentType::Declaration,
            })
            .await?;

        tracing::info!(payment_id = %payment.id, amount = %payment.amount, "Pagamento declarado");
        self.notification_service.notify_payment_declared(&payment).await;
        Ok(payment)
    }

    /// Lançamento direto já confirmado (fatura emitida na hora).
    pub async fn record_confirmed_entry(
        &self,
        entry: &NewPayment,
        confirmed_by: Uuid,
    ) -> Result<PaymentDeclaration, AppError> {
        let now = Utc::now();
        let invoice_number = generate_invoice_number(now);
        let payment = self
            .repo
            .create_confirmed(entry, confirmed_by, &invoice_number, now)
            .await?;

        tracing::info!(
            payment_id = %payment.id,
            invoice = %invoice_number,
            kind = ?entry.payment_type,
            "Lançamento confirmado registrado"
        );
        Ok(payment)
    }

    async fn assigned_employee_of(&self, owner_id: Option<Uuid>) -> Result<Option<Uuid>, AppError> {
        let Some(owner_id) = owner_id else {
            return Ok(None);
        };
        Ok(self
            .client_repo
            .find_by_user_id(owner_id)
            .await?
            .and_then(|p| p.assigned_employee_id))
    }

    async fn ensure_access(&self, actor: &Actor, payment: &PaymentDeclaration) -> Result<(), AppError> {
        let assigned = match actor.role {
            UserRole::Employee => self.assigned_employee_of(payment.user_id).await?,
            _ => None,
        };
        role_policy::ensure(can_access_payment(actor, payment.user_id, assigned))
    }

    pub async fn list(&self, actor: &Actor) -> Result<Vec<PaymentDeclaration>, AppError> {
        match actor.role {
            UserRole::Superadmin | UserRole::Manager => self.repo.list_all().await,
            UserRole::Client => self.repo.list_by_users(&[actor.id]).await,
            UserRole::Employee => {
                let owners: Vec<Uuid> = self
                    .client_repo
                    .list_by_employee(actor.id)
                    .await?
                    .into_iter()
                    .map(|p| p.user_id)
                    .collect();
                self.repo.list_by_users(&owners).await
            }
            UserRole::Consultant => Err(AppError::PermissionDenied),
        }
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<PaymentDeclaration, AppError> {
        let payment = self.repo.find_by_id(id).await?.ok_or(AppError::NotFound("payment"))?;
        self.ensure_access(actor, &payment).await?;
        Ok(payment)
    }

    pub async fn confirm(
        &self,
        actor: &Actor,
        id: Uuid,
        payload: &ConfirmPaymentPayload,
    ) -> Result<ConfirmationResponse, AppError> {
        role_policy::ensure(role_policy::can_manage_payments(actor.role))?;

        let payment = self.repo.find_by_id(id).await?.ok_or(AppError::NotFound("payment"))?;
        let plan = plan_confirmation(payment.status, payment.confirmation_code.as_deref(), payload)?;

        match plan {
            ConfirmationPlan::IssueCode => {
                let code = generate_confirmation_code();
                let payment = self
                    .repo
                    .store_confirmation_code(id, &code)
                    .await?
                    .ok_or(AppError::PaymentAlreadyProcessed)?;

                Ok(ConfirmationResponse { payment, requires_code: true, confirmation_code: Some(code) })
            }
            ConfirmationPlan::Finalize { code } => {
                let invoice_number = generate_invoice_number(Utc::now());
                let Some(payment) = self.repo.confirm(id, &code, actor.id, &invoice_number).await? else {
                    // Outra requisição chegou antes: descobre o porquê
                    let current = self.repo.find_by_id(id).await?.ok_or(AppError::NotFound("payment"))?;
                    return Err(if current.status.is_terminal() {
                        AppError::PaymentAlreadyProcessed
                    } else {
                        AppError::ConfirmationCodeMismatch
                    });
                };

                tracing::info!(payment_id = %id, invoice = %invoice_number, by = %actor.id, "Pagamento confirmado");
                self.notification_service.notify_payment_decision(&payment).await;
                Ok(ConfirmationResponse { payment, requires_code: false, confirmation_code: None })
            }
            ConfirmationPlan::Reject { reason } => {
                let payment = self
                    .repo
                    .reject(id, &reason, actor.id)
                    .await?
                    .ok_or(AppError::PaymentAlreadyProcessed)?;

                tracing::info!(payment_id = %id, by = %actor.id, "Pagamento rejeitado");
                self.notification_service.notify_payment_decision(&payment).await;
                Ok(ConfirmationResponse { payment, requires_code: false, confirmation_code: None })
            }
        }
    }

    // --- FATURAS ---

    async fn render_for(&self, actor: &Actor, payment: PaymentDeclaration) -> Result<(String, Vec<u8>), AppError> {
        self.ensure_access(actor, &payment).await?;

        let invoice_number = match (&payment.status, &payment.invoice_number) {
            (PaymentStatus::Confirmed, Some(number)) => number.clone(),
            _ => return Err(AppError::NotFound("invoice")),
        };

        let pdf = self.document_service.render_invoice(&payment)?;
        Ok((invoice_number, pdf))
    }

    pub async fn invoice_by_payment(&self, actor: &Actor, id: Uuid) -> Result<(String, Vec<u8>), AppError> {
        let payment = self.repo.find_by_id(id).await?.ok_or(AppError::NotFound("payment"))?;
        self.render_for(actor, payment).await
    }

    pub async fn invoice_by_number(&self, actor: &Actor, number: &str) -> Result<(String, Vec<u8>), AppError> {
        let payment = self
            .repo
            .find_by_invoice_number(number)
            .await?
            .ok_or(AppError::NotFound("invoice"))?;
        self.render_for(actor, payment).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(action: PaymentDecision, code: Option<&str>, reason: Option<&str>) -> ConfirmPaymentPayload {
        ConfirmPaymentPayload {
            action,
            confirmation_code: code.map(str::to_string),
            rejection_reason: reason.map(str::to_string),
        }
    }

    #[test]
    fn invoice_number_has_expected_shape() {
        let now = "2025-03-07T10:00:00Z".parse::<DateTime<Utc>>().expect("date");
        let number = generate_invoice_number(now);

        assert!(number.starts_with("ALO-20250307-"));
        let suffix = &number["ALO-20250307-".len()..];
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn confirmation_code_is_four_uppercase_alphanumerics() {
        for _ in 0..50 {
            let code = generate_confirmation_code();
            assert_eq!(code.len(), 4);
            assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn confirm_without_code_only_issues_a_code() {
        let plan = plan_confirmation(
            PaymentStatus::Pending,
            None,
            &payload(PaymentDecision::Confirmed, None, None),
        );
        assert_eq!(plan.expect("plan"), ConfirmationPlan::IssueCode);
    }

    #[test]
    fn wrong_or_missing_stored_code_is_a_conflict() {
        let wrong = plan_confirmation(
            PaymentStatus::Pending,
            Some("AB12"),
            &payload(PaymentDecision::Confirmed, Some("ZZ99"), None),
        );
        assert!(matches!(wrong, Err(AppError::ConfirmationCodeMismatch)));

        let never_issued = plan_confirmation(
            PaymentStatus::Pending,
            None,
            &payload(PaymentDecision::Confirmed, Some("AB12"), None),
        );
        assert!(matches!(never_issued, Err(AppError::ConfirmationCodeMismatch)));
    }

    #[test]
    fn matching_code_finalizes_once() {
        let first = plan_confirmation(
            PaymentStatus::Pending,
            Some("AB12"),
            &payload(PaymentDecision::Confirmed, Some("ab12"), None),
        );
        assert_eq!(first.expect("plan"), ConfirmationPlan::Finalize { code: "AB12".into() });

        // Depois de confirmado o código foi consumido e o status é terminal
        let second = plan_confirmation(
            PaymentStatus::Confirmed,
            None,
            &payload(PaymentDecision::Confirmed, Some("AB12"), None),
        );
        assert!(matches!(second, Err(AppError::PaymentAlreadyProcessed)));
    }

    #[test]
    fn rejection_needs_a_reason() {
        let missing = plan_confirmation(
            PaymentStatus::Pending,
            None,
            &payload(PaymentDecision::Rejected, None, Some("   ")),
        );
        assert!(matches!(
            missing,
            Err(AppError::InvalidField { field: "rejectionReason", .. })
        ));

        let ok = plan_confirmation(
            PaymentStatus::Pending,
            None,
            &payload(PaymentDecision::Rejected, None, Some("Reçu illisible")),
        );
        assert_eq!(ok.expect("plan"), ConfirmationPlan::Reject { reason: "Reçu illisible".into() });

        let terminal = plan_confirmation(
            PaymentStatus::Rejected,
            None,
            &payload(PaymentDecision::Rejected, None, Some("again")),
        );
        assert!(matches!(terminal, Err(AppError::PaymentAlreadyProcessed)));
    }

    #[test]
    fn invoice_access_follows_ownership() {
        let owner = Uuid::new_v4();
        let employee = Uuid::new_v4();

        let client = Actor { id: owner, role: UserRole::Client };
        let other_client = Actor { id: Uuid::new_v4(), role: UserRole::Client };
        let assigned = Actor { id: employee, role: UserRole::Employee };
        let other_employee = Actor { id: Uuid::new_v4(), role: UserRole::Employee };
        let manager = Actor { id: Uuid::new_v4(), role: UserRole::Manager };
        let admin = Actor { id: Uuid::new_v4(), role: UserRole::Superadmin };
        let consultant = Actor { id: Uuid::new_v4(), role: UserRole::Consultant };

        assert!(can_access_payment(&client, Some(owner), Some(employee)));
        assert!(can_access_payment(&assigned, Some(owner), Some(employee)));
        assert!(can_access_payment(&manager, Some(owner), Some(employee)));
        assert!(can_access_payment(&admin, None, None));

        assert!(!can_access_payment(&other_client, Some(owner), Some(employee)));
        assert!(!can_access_payment(&other_employee, Some(owner), Some(employee)));
        assert!(!can_access_payment(&consultant, Some(owner), Some(employee)));
        // Pagamento de prospect (sem dono) não é de nenhum cliente
        assert!(!can_access_payment(&other_client, None, None));
    }
}
