// src/services/role_policy.rs
//
// Regras de papel puras, sem estado. Toda checagem acontece antes de qualquer
// escrita: uma negação nunca deixa efeito parcial.

use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::auth::{Actor, UserRole};

/// Lista explícita de quem pode criar quem (não é por nível).
pub fn can_create_role(creator: UserRole, target: UserRole) -> bool {
    use UserRole::*;
    matches!(
        (creator, target),
        (Superadmin, Manager)
            | (Superadmin, Employee)
            | (Superadmin, Consultant)
            | (Manager, Employee)
            | (Manager, Client)
            | (Employee, Client)
    )
}

/// A posse (EMPLOYEE -> seus clientes) é verificada por quem chama.
pub fn can_access_entity(
    accessor_role: UserRole,
    target_role: UserRole,
    accessor_id: Uuid,
    target_id: Uuid,
) -> bool {
    if accessor_id == target_id {
        return true;
    }

    match accessor_role {
        UserRole::Superadmin => true,
        UserRole::Manager => matches!(target_role, UserRole::Employee | UserRole::Client),
        UserRole::Employee => target_role == UserRole::Client,
        UserRole::Consultant | UserRole::Client => false,
    }
}

/// Só o MANAGER altera processos; EMPLOYEE apenas lê.
pub fn can_mutate_case(role: UserRole) -> bool {
    role == UserRole::Manager
}

pub fn can_manage_payments(role: UserRole) -> bool {
    matches!(role, UserRole::Manager | UserRole::Superadmin)
}

pub fn can_assign_prospects(role: UserRole) -> bool {
    matches!(role, UserRole::Manager | UserRole::Superadmin)
}

/// Reatribuição de clientes e consulta de carga da equipe.
pub fn can_reassign_clients(role: UserRole) -> bool {
    matches!(role, UserRole::Manager | UserRole::Superadmin)
}

pub fn ensure(allowed: bool) -> Result<(), AppError> {
    if allowed {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}

pub fn ensure_can_create(actor: &Actor, target: UserRole) -> Result<(), AppError> {
    ensure(can_create_role(actor.role, target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use UserRole::*;

    #[test]
    fn create_role_matches_allow_list_exactly() {
        let allowed = [
            (Superadmin, Manager),
            (Superadmin, Employee),
            (Superadmin, Consultant),
            (Manager, Employee),
            (Manager, Client),
            (Employee, Client),
        ];

        for creator in UserRole::ALL {
            for target in UserRole::ALL {
                assert_eq!(
                    can_create_role(creator, target),
                    allowed.contains(&(creator, target)),
                    "{creator} -> {target}"
                );
            }
        }
    }

    #[test]
    fn superadmin_cannot_create_clients_or_superadmins() {
        assert!(!can_create_role(Superadmin, Client));
        assert!(!can_create_role(Superadmin, Superadmin));
        assert!(!can_create_role(Consultant, Client));
    }

    #[test]
    fn access_follows_hierarchy_and_self() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert!(can_access_entity(Superadmin, Manager, me, other));
        assert!(can_access_entity(Manager, Employee, me, other));
        assert!(can_access_entity(Manager, Client, me, other));
        assert!(!can_access_entity(Manager, Manager, me, other));
        assert!(can_access_entity(Employee, Client, me, other));
        assert!(!can_access_entity(Employee, Employee, me, other));
        assert!(!can_access_entity(Client, Client, me, other));
        assert!(!can_access_entity(Consultant, Client, me, other));

        // O próprio registro é sempre acessível
        assert!(can_access_entity(Client, Client, me, me));
        assert!(can_access_entity(Consultant, Consultant, me, me));
    }

    #[test]
    fn only_managers_mutate_cases() {
        for role in UserRole::ALL {
            assert_eq!(can_mutate_case(role), role == Manager);
        }
    }
}
