// src/services/notification_service.rs

use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{NotificationRepository, UserRepository},
    models::{
        auth::{User, UserRole},
        notification::{Notification, NotificationType, UnreadCount},
        payment::{PaymentDeclaration, PaymentStatus},
        prospect::Prospect,
    },
    services::realtime::RealtimePush,
};

const LIVE_EVENT: &str = "notification";
const LIST_LIMIT: i64 = 100;

// =============================================================================
//  DESTINATÁRIOS (funções puras)
// =============================================================================

/// Remove repetidos mantendo a ordem de chegada.
pub fn dedup_recipients(ids: impl IntoIterator<Item = Uuid>) -> Vec<Uuid> {
    let mut out: Vec<Uuid> = Vec::new();
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

/// Cliente sempre; o funcionário só se não for quem fez a mudança.
pub fn case_update_recipients(
    client_user_id: Uuid,
    assigned_employee_id: Option<Uuid>,
    actor_id: Uuid,
) -> Vec<Uuid> {
    let employee = assigned_employee_id.filter(|id| *id != actor_id);
    dedup_recipients(std::iter::once(client_user_id).chain(employee))
}

/// Supervisores avisados de uma criação (sem o próprio autor).
pub fn creation_supervisors(
    supervisors: &[Uuid],
    actor_id: Uuid,
    already_notified: &[Uuid],
) -> Vec<Uuid> {
    dedup_recipients(
        supervisors
            .iter()
            .copied()
            .filter(|id| *id != actor_id && !already_notified.contains(id)),
    )
}

/// Todos os SUPERADMIN ativos + o responsável pelo prospect.
pub fn handoff_recipients(superadmins: &[Uuid], assignee: Option<Uuid>) -> Vec<Uuid> {
    dedup_recipients(superadmins.iter().copied().chain(assignee))
}

// =============================================================================
//  SERVIÇO
// =============================================================================

#[derive(Clone)]
pub struct NotificationService {
    repo: NotificationRepository,
    user_repo: UserRepository,
    push: Arc<dyn RealtimePush>,
}

impl NotificationService {
    pub fn new(
        repo: NotificationRepository,
        user_repo: UserRepository,
        push: Arc<dyn RealtimePush>,
    ) -> Self {
        Self { repo, user_repo, push }
    }

    /// Grava uma notificação e tenta o envio ao vivo.
    /// Falhas só vão para o log: a operação de negócio nunca quebra aqui.
    pub async fn notify(
        &self,
        user_id: Uuid,
        title: &str,
        message: &str,
        notification_type: NotificationType,
        related_id: Option<Uuid>,
    ) {
        let notification = match self
            .repo
            .create(user_id, title, message, notification_type, related_id)
            .await
        {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(%user_id, "Falha ao gravar notificação: {}", e);
                return;
            }
        };

        match serde_json::to_value(&notification) {
            Ok(payload) => self.push.push(user_id, LIVE_EVENT, payload).await,
            Err(e) => tracing::warn!("Falha ao serializar notificação: {}", e),
        }
    }

    async fn active_ids(&self, role: UserRole) -> Vec<Uuid> {
        match self.user_repo.list_active_by_role(role).await {
            Ok(users) => users.into_iter().map(|u| u.id).collect(),
            Err(e) => {
                tracing::warn!(%role, "Falha ao listar destinatários: {}", e);
                Vec::new()
            }
        }
    }

    // --- FAN-OUT ---

    pub async fn send_creation_notifications(
        &self,
        created: &User,
        actor_id: Uuid,
        assigned_employee_id: Option<Uuid>,
    ) {
        self.notify(
            created.id,
            "Bienvenue chez ALO",
            "Votre compte a été créé. Consultez votre e-mail pour vos identifiants.",
            NotificationType::UserCreated,
            Some(created.id),
        )
        .await;

        let mut notified = vec![created.id];
        if let Some(employee_id) = assigned_employee_id.filter(|id| *id != actor_id) {
            self.notify(
                employee_id,
                "Nouveau client assigné",
                &format!("Le client {} vous a été assigné.", created.full_name),
                NotificationType::ClientAssigned,
                Some(created.id),
            )
            .await;
            notified.push(employee_id);
        }

        let mut supervisors = self.active_ids(UserRole::Superadmin).await;
        supervisors.extend(self.active_ids(UserRole::Manager).await);

        for id in creation_supervisors(&supervisors, actor_id, &notified) {
            self.notify(
                id,
                "Nouvel utilisateur",
                &format!("{} ({}) a été créé.", created.full_name, created.role),
                NotificationType::UserCreated,
                Some(created.id),
            )
            .await;
        }
    }

    pub async fn notify_case_update(
        &self,
        case_id: Uuid,
        client_user_id: Uuid,
        assigned_employee_id: Option<Uuid>,
        actor_id: Uuid,
        step_title: Option<&str>,
    ) {
        let message = match step_title {
            Some(title) => format!("Votre dossier est passé à l'étape : {title}"),
            None => "Votre dossier est terminé.".to_string(),
        };

        for id in case_update_recipients(client_user_id, assigned_employee_id, actor_id) {
            self.notify(
                id,
                "Mise à jour du dossier",
                &message,
                NotificationType::CaseUpdate,
                Some(case_id),
            )
            .await;
        }
    }

    pub async fn notify_payment_declared(&self, payment: &PaymentDeclaration) {
        for id in self.active_ids(UserRole::Manager).await {
            self.notify(
                id,
                "Nouveau paiement déclaré",
                &format!(
                    "{} a déclaré un paiement de {} {}.",
                    payment.client_name, payment.amount, payment.currency
                ),
                NotificationType::PaymentDeclared,
                Some(payment.id),
            )
            .await;
        }
    }

    pub async fn notify_payment_decision(&self, payment: &PaymentDeclaration) {
        let Some(owner) = payment.user_id else {
            return;
        };

        let (title, message, kind) = match payment.status {
            PaymentStatus::Confirmed => (
                "Paiement confirmé",
                format!(
                    "Votre paiement de {} {} a été confirmé. Facture : {}",
                    payment.amount,
                    payment.currency,
                    payment.invoice_number.as_deref().unwrap_or("-")
                ),
                NotificationType::PaymentConfirmed,
            ),
            PaymentStatus::Rejected => (
                "Paiement rejeté",
                format!(
                    "Votre paiement de {} {} a été rejeté : {}",
                    payment.amount,
                    payment.currency,
                    payment.rejection_reason.as_deref().unwrap_or("-")
                ),
                NotificationType::PaymentRejected,
            ),
            PaymentStatus::Pending => return,
        };

        self.notify(owner, title, &message, kind, Some(payment.id)).await;
    }

    pub async fn notify_prospect_assigned(&self, prospect: &Prospect) {
        let Some(assignee) = prospect.assigned_to else {
            return;
        };
        self.notify(
            assignee,
            "Nouveau prospect assigné",
            &format!("Le prospect {} vous a été assigné.", prospect.name),
            NotificationType::ProspectAssigned,
            Some(prospect.id),
        )
        .await;
    }

    pub async fn notify_consultant_handoff(&self, prospect: &Prospect, invoice_number: &str) {
        let superadmins = self.active_ids(UserRole::Superadmin).await;
        let message = format!(
            "Le prospect {} passe en consultation (frais 50 000, facture {}).",
            prospect.name, invoice_number
        );

        for id in handoff_recipients(&superadmins, prospect.assigned_to) {
            self.notify(
                id,
                "Consultation payée",
                &message,
                NotificationType::ConsultationHandoff,
                Some(prospect.id),
            )
            .await;
        }
    }

    pub async fn notify_consultant_notes(&self, prospect: &Prospect, actor_id: Uuid) {
        let Some(assignee) = prospect.assigned_to.filter(|id| *id != actor_id) else {
            return;
        };
        self.notify(
            assignee,
            "Avis du consultant",
            &format!("Le consultant a ajouté ses notes sur {}.", prospect.name),
            NotificationType::ConsultantNotes,
            Some(prospect.id),
        )
        .await;
    }

    pub async fn notify_prospect_converted(&self, prospect: &Prospect, actor_id: Uuid) {
        let Some(assignee) = prospect.assigned_to.filter(|id| *id != actor_id) else {
            return;
        };
        self.notify(
            assignee,
            "Prospect converti",
            &format!("{} est maintenant client.", prospect.name),
            NotificationType::ProspectConverted,
            prospect.client_user_id,
        )
        .await;
    }

    pub async fn notify_client_reassigned(
        &self,
        client_user_id: Uuid,
        client_name: &str,
        new_employee_id: Uuid,
        new_employee_name: &str,
    ) {
        self.notify(
            new_employee_id,
            "Nouveau client assigné",
            &format!("Le client {client_name} vous a été assigné."),
            NotificationType::ClientAssigned,
            Some(client_user_id),
        )
        .await;
        self.notify(
            client_user_id,
            "Nouveau conseiller",
            &format!("Votre dossier est désormais suivi par {new_employee_name}."),
            NotificationType::ClientAssigned,
            Some(new_employee_id),
        )
        .await;
    }

    // --- CAIXA DE ENTRADA ---

    pub async fn list_mine(&self, user_id: Uuid) -> Result<Vec<Notification>, AppError> {
        self.repo.list_for_user(user_id, LIST_LIMIT).await
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<UnreadCount, AppError> {
        let unread = self.repo.count_unread(user_id).await?;
        Ok(UnreadCount { unread })
    }

    pub async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<Notification, AppError> {
        self.repo
            .mark_read(id, user_id)
            .await?
            .ok_or(AppError::NotFound("notification"))
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, AppError> {
        self.repo.mark_all_read(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_update_skips_employee_when_it_is_the_actor() {
        let client = Uuid::new_v4();
        let employee = Uuid::new_v4();
        let manager = Uuid::new_v4();

        assert_eq!(case_update_recipients(client, Some(employee), manager), vec![client, employee]);
        assert_eq!(case_update_recipients(client, Some(employee), employee), vec![client]);
        assert_eq!(case_update_recipients(client, None, manager), vec![client]);
    }

    #[test]
    fn handoff_recipients_are_deduplicated() {
        let admin = Uuid::new_v4();
        let other_admin = Uuid::new_v4();

        assert_eq!(
            handoff_recipients(&[admin, other_admin], Some(admin)),
            vec![admin, other_admin]
        );

        let assignee = Uuid::new_v4();
        assert_eq!(
            handoff_recipients(&[admin], Some(assignee)),
            vec![admin, assignee]
        );
    }

    #[test]
    fn creation_supervisors_exclude_actor_and_already_notified() {
        let actor = Uuid::new_v4();
        let employee = Uuid::new_v4();
        let admin = Uuid::new_v4();

        let out = creation_supervisors(&[actor, admin, employee, admin], actor, &[employee]);
        assert_eq!(out, vec![admin]);
    }
}
