// src/services/assignment_service.rs

use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ActivityRepository, CaseRepository, ClientRepository, UserRepository},
    models::{
        auth::{Actor, User, UserRole},
        client::{Assignment, AssignmentType, ClientProfile, EmployeeWorkload},
    },
    services::{notification_service::NotificationService, role_policy},
};

/// Resultado da regra de decisão (antes de tocar no banco).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentDecision {
    Explicit(Uuid),
    SelfAssign(AssignmentType),
    /// `requested = false` quando é só o fallback
    LoadBalance { requested: bool },
}

/// Ordem fixa, a primeira regra que casa ganha.
pub fn decide(
    explicit_employee_id: Option<Uuid>,
    creator_role: UserRole,
    use_load_balancing: bool,
) -> AssignmentDecision {
    if let Some(id) = explicit_employee_id {
        return AssignmentDecision::Explicit(id);
    }

    match creator_role {
        UserRole::Employee => AssignmentDecision::SelfAssign(AssignmentType::Auto),
        UserRole::Manager => AssignmentDecision::SelfAssign(AssignmentType::ManagerSelf),
        _ => AssignmentDecision::LoadBalance { requested: use_load_balancing },
    }
}

/// Menor contagem ganha; empate fica com o primeiro da lista.
pub fn pick_least_busy(counts: &[(Uuid, i64)]) -> Option<Uuid> {
    let mut best: Option<(Uuid, i64)> = None;
    for &(id, count) in counts {
        match best {
            Some((_, best_count)) if count >= best_count => {}
            _ => best = Some((id, count)),
        }
    }
    best.map(|(id, _)| id)
}

fn can_hold_clients(user: &User) -> bool {
    user.is_active && matches!(user.role, UserRole::Employee | UserRole::Manager)
}

#[derive(Clone)]
pub struct AssignmentService {
    user_repo: UserRepository,
    client_repo: ClientRepository,
    case_repo: CaseRepository,
    activity_repo: ActivityRepository,
    notification_service: NotificationService,
}

impl AssignmentService {
    pub fn new(
        user_repo: UserRepository,
        client_repo: ClientRepository,
        case_repo: CaseRepository,
        activity_repo: ActivityRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self { user_repo, client_repo, case_repo, activity_repo, notification_service }
    }

    async fn find_assignable(&self, employee_id: Uuid) -> Result<User, AppError> {
        self.user_repo
            .find_by_id(employee_id)
            .await?
            .filter(can_hold_clients)
            .ok_or(AppError::NotFound("employee"))
    }

    pub async fn assign_client_to_employee(
        &self,
        explicit_employee_id: Option<Uuid>,
        creator: &User,
        use_load_balancing: bool,
    ) -> Result<Assignment, AppError> {
        let assignment = match decide(explicit_employee_id, creator.role, use_load_balancing) {
            AssignmentDecision::Explicit(id) => {
                let employee = self.find_assignable(id).await?;
                Assignment {
                    assigned_employee_id: Some(employee.id),
                    assigned_employee_name: Some(employee.full_name),
                    assignment_type: AssignmentType::Manual,
                }
            }
            AssignmentDecision::SelfAssign(assignment_type) => Assignment {
                assigned_employee_id: Some(creator.id),
                assigned_employee_name: Some(creator.full_name.clone()),
                assignment_type,
            },
            AssignmentDecision::LoadBalance { requested } => match self.find_least_busy_employee().await? {
                Some(employee) => Assignment {
                    assigned_employee_id: Some(employee.id),
                    assigned_employee_name: Some(employee.full_name),
                    assignment_type: AssignmentType::LoadBalanced,
                },
                None => {
                    tracing::warn!(requested, "Nenhum funcionário ativo: cliente fica sem responsável");
                    Assignment {
                        assigned_employee_id: None,
                        assigned_employee_name: None,
                        assignment_type: AssignmentType::Unassigned,
                    }
                }
            },
        };

        Ok(assignment)
    }

    // Contagem ao vivo, sem lock (desvio momentâneo é aceito)
    pub async fn find_least_busy_employee(&self) -> Result<Option<User>, AppError> {
        let employees = self.user_repo.list_active_by_role(UserRole::Employee).await?;

        let mut counts = Vec::with_capacity(employees.len());
        for employee in &employees {
            counts.push((employee.id, self.client_repo.count_by_employee(employee.id).await?));
        }

        let chosen = pick_least_busy(&counts);
        Ok(employees.into_iter().find(|e| Some(e.id) == chosen))
    }

    pub async fn reassign_client(
        &self,
        actor: &Actor,
        client_id: Uuid,
        new_employee_id: Uuid,
    ) -> Result<ClientProfile, AppError> {
        role_policy::ensure(role_policy::can_reassign_clients(actor.role))?;

        let current = self
            .client_repo
            .find_by_id(client_id)
            .await?
            .ok_or(AppError::NotFound("client"))?;
        let employee = self.find_assignable(new_employee_id).await?;

        let updated = self
            .client_repo
            .update_assignment(client_id, employee.id, &employee.full_name)
            .await?
            .ok_or(AppError::NotFound("client"))?;

        let cases = self
            .case_repo
            .update_assignment_for_client(updated.user_id, employee.id)
            .await?;

        self.activity_repo
            .log(
                actor.id,
                "client_reassigned",
                json!({
                    "clientId": client_id,
                    "oldEmployeeId": current.assigned_employee_id,
                    "newEmployeeId": employee.id,
                    "casesUpdated": cases,
                }),
            )
            .await?;

        self.notification_service
            .notify_client_reassigned(updated.user_id, &updated.full_name, employee.id, &employee.full_name)
            .await;

        Ok(updated)
    }

    pub async fn employee_workload(&self, actor: &Actor) -> Result<Vec<EmployeeWorkload>, AppError> {
        role_policy::ensure(role_policy::can_reassign_clients(actor.role))?;

        let employees = self.user_repo.list_active_by_role(UserRole::Employee).await?;
        let mut workload = Vec::with_capacity(employees.len());
        for employee in employees {
            let client_count = self.client_repo.count_by_employee(employee.id).await?;
            workload.push(EmployeeWorkload {
                employee_id: employee.id,
                full_name: employee.full_name,
                client_count,
            });
        }

        Ok(workload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_employee_wins_over_everything() {
        let id = Uuid::new_v4();
        for role in UserRole::ALL {
            assert_eq!(decide(Some(id), role, true), AssignmentDecision::Explicit(id));
        }
    }

    #[test]
    fn creators_self_assign_by_role() {
        assert_eq!(
            decide(None, UserRole::Employee, true),
            AssignmentDecision::SelfAssign(AssignmentType::Auto)
        );
        assert_eq!(
            decide(None, UserRole::Manager, false),
            AssignmentDecision::SelfAssign(AssignmentType::ManagerSelf)
        );
    }

    #[test]
    fn other_creators_fall_back_to_load_balancing() {
        assert_eq!(
            decide(None, UserRole::Superadmin, true),
            AssignmentDecision::LoadBalance { requested: true }
        );
        assert_eq!(
            decide(None, UserRole::Superadmin, false),
            AssignmentDecision::LoadBalance { requested: false }
        );
    }

    #[test]
    fn least_busy_takes_minimum_and_first_on_ties() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        assert_eq!(pick_least_busy(&[(a, 3), (b, 1), (c, 2)]), Some(b));
        assert_eq!(pick_least_busy(&[(a, 2), (b, 1), (c, 1)]), Some(b));
        assert_eq!(pick_least_busy(&[(a, 0), (b, 0)]), Some(a));
        assert_eq!(pick_least_busy(&[]), None);
    }
}
