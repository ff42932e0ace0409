// src/services/case_service.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{case_repo::CaseChanges, CaseRepository, ClientRepository},
    models::{
        auth::{Actor, UserRole},
        client::{Case, CaseStatus, UpdateCasePayload},
    },
    services::{notification_service::NotificationService, role_policy},
};

// =============================================================================
//  REGRAS PURAS
// =============================================================================

/// Só um passo por vez, e nunca além do fim do workflow.
pub fn check_step_change(current: usize, requested: usize, total: usize) -> Result<(), AppError> {
    if requested > total {
        return Err(AppError::StepOutOfRange { requested, total });
    }
    if current.abs_diff(requested) > 1 {
        return Err(AppError::SequentialViolation { current, requested });
    }
    Ok(())
}

/// 100 × etapa / total (0 quando não há etapas).
pub fn compute_progress(step_index: usize, total_steps: usize) -> f64 {
    if total_steps == 0 {
        return 0.0;
    }
    100.0 * step_index as f64 / total_steps as f64
}

pub fn can_view_case(actor: &Actor, case: &Case) -> bool {
    match actor.role {
        UserRole::Superadmin | UserRole::Manager => true,
        UserRole::Employee => case.assigned_employee_id == Some(actor.id),
        UserRole::Client => case.client_id == actor.id,
        UserRole::Consultant => false,
    }
}

/// Valores finais do update e se a etapa mudou.
pub fn plan_case_update(case: &Case, payload: &UpdateCasePayload) -> Result<(CaseChanges, bool), AppError> {
    let current = case.current_index();
    let total = case.total_steps();

    let requested = match payload.current_step_index {
        Some(index) => {
            let index = usize::try_from(index)
                .map_err(|_| AppError::InvalidField { field: "currentStepIndex", code: "invalid_step" })?;
            check_step_change(current, index, total)?;
            index
        }
        None => current,
    };
    let step_changed = requested != current;

    let status = match payload.status {
        Some(status) => status,
        None if step_changed => CaseStatus::derived_from_step(requested, total),
        None => case.status,
    };

    let changes = CaseChanges {
        expected_step_index: case.current_step_index,
        current_step_index: requested as i32,
        status,
        notes: payload.notes.clone().or_else(|| case.notes.clone()),
    };

    Ok((changes, step_changed))
}

// =============================================================================
//  SERVIÇO
// =============================================================================

#[derive(Clone)]
pub struct CaseService {
    repo: CaseRepository,
    client_repo: ClientRepository,
    notification_service: NotificationService,
}

impl CaseService {
    pub fn new(
        repo: CaseRepository,
        client_repo: ClientRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self { repo, client_repo, notification_service }
    }

    pub async fn list_cases(&self, actor: &Actor) -> Result<Vec<Case>, AppError> {
        match actor.role {
            UserRole::Superadmin | UserRole::Manager => self.repo.list_all().await,
            UserRole::Employee => self.repo.list_by_employee(actor.id).await,
            UserRole::Client => self.repo.list_by_client(actor.id).await,
            UserRole::Consultant => Err(AppError::PermissionDenied),
        }
    }

    pub async fn get_case(&self, actor: &Actor, id: Uuid) -> Result<Case, AppError> {
        let case = self.repo.find_by_id(id).await?.ok_or(AppError::NotFound("case"))?;
        role_policy::ensure(can_view_case(actor, &case))?;
        Ok(case)
    }

    /// Único ponto de alteração de processo (PATCH e /progress chegam aqui).
    pub async fn update_case(
        &self,
        actor: &Actor,
        id: Uuid,
        payload: &UpdateCasePayload,
    ) -> Result<Case, AppError> {
        role_policy::ensure(role_policy::can_mutate_case(actor.role))?;

        let case = self.repo.find_by_id(id).await?.ok_or(AppError::NotFound("case"))?;
        let (changes, step_changed) = plan_case_update(&case, payload)?;

        let Some(updated) = self.repo.apply_changes(id, &changes).await? else {
            // Outra alteração mexeu na etapa entre a leitura e a escrita
            let current = self.repo.find_by_id(id).await?.ok_or(AppError::NotFound("case"))?;
            return Err(AppError::SequentialViolation {
                current: current.current_index(),
                requested: changes.current_step_index as usize,
            });
        };

        if step_changed || payload.status.is_some() {
            let index = updated.current_index();
            let progress = compute_progress(index, updated.total_steps());
            self.client_repo
                .update_progress(updated.client_id, updated.current_step_index, progress, updated.status)
                .await?;
        }

        if step_changed {
            tracing::info!(
                case_id = %id,
                from = case.current_step_index,
                to = updated.current_step_index,
                "Etapa do processo alterada"
            );

            let step_title = updated
                .workflow_steps
                .0
                .get(updated.current_index())
                .map(|s| s.title.as_str());
            self.notification_service
                .notify_case_update(id, updated.client_id, updated.assigned_employee_id, actor.id, step_title)
                .await;
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::client::WorkflowStep;
    use chrono::Utc;
    use sqlx::types::Json;

    fn case_with(steps: usize, index: i32) -> Case {
        let workflow = (0..steps)
            .map(|i| WorkflowStep {
                title: format!("Étape {i}"),
                description: String::new(),
                documents: Vec::new(),
                duration: "1 semaine".into(),
            })
            .collect();

        Case {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            client_name: "Client".into(),
            assigned_employee_id: Some(Uuid::new_v4()),
            country: "Canada".into(),
            visa_type: "Permis de travail".into(),
            workflow_steps: Json(workflow),
            current_step_index: index,
            status: CaseStatus::Nouveau,
            notes: Some("premier contact".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn step_to(index: i32) -> UpdateCasePayload {
        UpdateCasePayload { current_step_index: Some(index), ..Default::default() }
    }

    #[test]
    fn steps_move_at_most_one_at_a_time() {
        assert!(check_step_change(2, 3, 10).is_ok());
        assert!(check_step_change(2, 1, 10).is_ok());
        assert!(check_step_change(2, 2, 10).is_ok());
        assert!(matches!(
            check_step_change(2, 4, 10),
            Err(AppError::SequentialViolation { current: 2, requested: 4 })
        ));
        assert!(matches!(
            check_step_change(5, 0, 10),
            Err(AppError::SequentialViolation { .. })
        ));
        assert!(matches!(
            check_step_change(10, 11, 10),
            Err(AppError::StepOutOfRange { requested: 11, total: 10 })
        ));
    }

    #[test]
    fn walking_a_sequence_never_jumps() {
        let requests = [1usize, 2, 4, 3, 2, 0, 1];
        let mut index = 0usize;
        let mut history = vec![index];

        for requested in requests {
            if check_step_change(index, requested, 10).is_ok() {
                index = requested;
            }
            history.push(index);
        }

        assert!(history.windows(2).all(|w| w[0].abs_diff(w[1]) <= 1));
        assert_eq!(index, 1);
    }

    #[test]
    fn progress_is_proportional_and_zero_without_steps() {
        assert_eq!(compute_progress(0, 10), 0.0);
        assert_eq!(compute_progress(3, 10), 30.0);
        assert_eq!(compute_progress(10, 10), 100.0);
        assert_eq!(compute_progress(0, 0), 0.0);
        assert!((compute_progress(1, 3) - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn status_is_derived_from_step_when_not_given() {
        let case = case_with(10, 0);
        let (changes, changed) = plan_case_update(&case, &step_to(1)).expect("plan");
        assert!(changed);
        assert_eq!(changes.status, CaseStatus::EnCours);
        assert_eq!(changes.expected_step_index, 0);
        assert_eq!(changes.notes.as_deref(), Some("premier contact"));

        let last = case_with(10, 9);
        let (changes, _) = plan_case_update(&last, &step_to(10)).expect("plan");
        assert_eq!(changes.status, CaseStatus::Termine);

        let second = case_with(10, 1);
        let (changes, _) = plan_case_update(&second, &step_to(0)).expect("plan");
        assert_eq!(changes.status, CaseStatus::Nouveau);
    }

    #[test]
    fn explicit_status_wins_and_jumps_are_rejected() {
        let case = case_with(10, 2);
        let payload = UpdateCasePayload {
            current_step_index: Some(3),
            status: Some(CaseStatus::EnAttente),
            notes: Some("pièces manquantes".into()),
        };
        let (changes, _) = plan_case_update(&case, &payload).expect("plan");
        assert_eq!(changes.status, CaseStatus::EnAttente);
        assert_eq!(changes.notes.as_deref(), Some("pièces manquantes"));

        assert!(matches!(
            plan_case_update(&case, &step_to(5)),
            Err(AppError::SequentialViolation { current: 2, requested: 5 })
        ));
    }

    #[test]
    fn notes_only_update_keeps_step_and_status() {
        let case = case_with(10, 4);
        let payload = UpdateCasePayload { notes: Some("rappel".into()), ..Default::default() };
        let (changes, changed) = plan_case_update(&case, &payload).expect("plan");
        assert!(!changed);
        assert_eq!(changes.current_step_index, 4);
        assert_eq!(changes.status, CaseStatus::Nouveau);
    }

    #[test]
    fn case_visibility_by_role() {
        let case = case_with(3, 0);
        let owner = Actor { id: case.client_id, role: UserRole::Client };
        let employee = Actor { id: case.assigned_employee_id.expect("employee"), role: UserRole::Employee };

        assert!(can_view_case(&owner, &case));
        assert!(can_view_case(&employee, &case));
        assert!(can_view_case(&Actor { id: Uuid::new_v4(), role: UserRole::Manager }, &case));
        assert!(!can_view_case(&Actor { id: Uuid::new_v4(), role: UserRole::Client }, &case));
        assert!(!can_view_case(&Actor { id: Uuid::new_v4(), role: UserRole::Employee }, &case));
        assert!(!can_view_case(&Actor { id: Uuid::new_v4(), role: UserRole::Consultant }, &case));
    }
}

#[cfg(all(test, feature = "db-tests"))]
mod db_tests {
    use super::*;
    use crate::services::{client_service::OnboardRequest, test_support};
    use sqlx::PgPool;

    #[sqlx::test]
    async fn step_change_mirrors_progress_on_the_client(pool: PgPool) -> anyhow::Result<()> {
        let state = test_support::state(pool);
        let manager = test_support::staff(&state, UserRole::Manager, "Ibrahima Fall").await?;
        let actor = Actor::from(&manager);

        let created = state
            .client_service
            .onboard_client(
                &manager,
                &OnboardRequest {
                    email: "progress@mail.com".to_string(),
                    full_name: "Mariama Ba".to_string(),
                    country: "Canada".to_string(),
                    visa_type: "Work Permit".to_string(),
                    ..Default::default()
                },
            )
            .await?;
        let case_id = created.outcome.case_id;

        let updated = state
            .case_service
            .update_case(
                &actor,
                case_id,
                &UpdateCasePayload { current_step_index: Some(1), status: None, notes: None },
            )
            .await?;
        assert_eq!(updated.current_step_index, 1);
        assert_eq!(updated.status, CaseStatus::EnCours);

        let profile = state.client_service.get_client(&actor, created.outcome.client_id).await?;
        assert_eq!(profile.current_step, 1);
        assert_eq!(profile.progress_percentage, 10.0);
        assert_eq!(profile.current_status, CaseStatus::EnCours);

        // Pular etapas não grava nada
        let jump = state
            .case_service
            .update_case(
                &actor,
                case_id,
                &UpdateCasePayload { current_step_index: Some(3), status: None, notes: None },
            )
            .await;
        assert!(matches!(jump, Err(AppError::SequentialViolation { current: 1, requested: 3 })));

        let unchanged = state.case_service.get_case(&actor, case_id).await?;
        assert_eq!(unchanged.current_step_index, 1);
        let profile = state.client_service.get_client(&actor, created.outcome.client_id).await?;
        assert_eq!(profile.progress_percentage, 10.0);
        Ok(())
    }
}
