// src/services/user_service.rs

use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ClientRepository, UserRepository},
    models::auth::{Actor, CreateUserPayload, User, UserCreatedResponse, UserRole},
    services::{
        auth::{generate_temporary_password, AuthService},
        mailer::{deliver_credentials, CredentialsMail, Mailer},
        notification_service::NotificationService,
        role_policy,
    },
};

/// Conta recém-criada pela equipe.
#[derive(Debug)]
pub struct ProvisionedAccount {
    pub user: User,
    /// Senha inicial (informada ou gerada)
    pub initial_password: String,
    pub generated: bool,
}

/// EMPLOYEE só enxerga os clientes atribuídos a ele.
pub fn is_user_visible(actor: &Actor, target: &User, owned_client_ids: &[Uuid]) -> bool {
    if !role_policy::can_access_entity(actor.role, target.role, actor.id, target.id) {
        return false;
    }

    if actor.role == UserRole::Employee && target.role == UserRole::Client && target.id != actor.id {
        return owned_client_ids.contains(&target.id);
    }

    true
}

#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    client_repo: ClientRepository,
    auth_service: AuthService,
    notification_service: NotificationService,
    mailer: Arc<dyn Mailer>,
}

impl UserService {
    pub fn new(
        user_repo: UserRepository,
        client_repo: ClientRepository,
        auth_service: AuthService,
        notification_service: NotificationService,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self { user_repo, client_repo, auth_service, notification_service, mailer }
    }

    /// Cria a conta (e-mail duplicado é rejeitado antes de qualquer escrita).
    pub async fn provision_account(
        &self,
        email: &str,
        full_name: &str,
        phone: Option<&str>,
        role: UserRole,
        created_by: Uuid,
        password: Option<&str>,
    ) -> Result<ProvisionedAccount, AppError> {
        if self.user_repo.find_by_email(email).await?.is_some() {
            return Err(AppError::EmailAlreadyExists);
        }

        let (initial_password, generated) = match password {
            Some(p) => (p.to_string(), false),
            None => (generate_temporary_password(), true),
        };

        let user = self
            .auth_service
            .create_account(email, &initial_password, full_name, phone, role, Some(created_by))
            .await?;

        tracing::info!(user_id = %user.id, role = %role, by = %created_by, "Conta criada");
        Ok(ProvisionedAccount { user, initial_password, generated })
    }

    pub async fn send_credentials(&self, user: &User, password: &str) -> bool {
        deliver_credentials(
            self.mailer.as_ref(),
            CredentialsMail {
                to: &user.email,
                full_name: &user.full_name,
                role: user.role,
                temporary_password: password,
            },
        )
        .await
    }

    // POST /api/users (CLIENT passa por /api/clients)
    pub async fn create_staff_user(
        &self,
        actor: &Actor,
        payload: &CreateUserPayload,
    ) -> Result<UserCreatedResponse, AppError> {
        if payload.role == UserRole::Client {
            return Err(AppError::InvalidField { field: "role", code: "use_clients_endpoint" });
        }
        role_policy::ensure_can_create(actor, payload.role)?;

        let account = self
            .provision_account(
                &payload.email,
                &payload.full_name,
                payload.phone.as_deref(),
                payload.role,
                actor.id,
                payload.password.as_deref(),
            )
            .await?;

        let email_sent = self.send_credentials(&account.user, &account.initial_password).await;
        self.notification_service
            .send_creation_notifications(&account.user, actor.id, None)
            .await;

        Ok(UserCreatedResponse {
            temporary_password: account.generated.then_some(account.initial_password),
            user: account.user,
            email_sent,
        })
    }

    async fn owned_client_ids(&self, actor: &Actor) -> Result<Vec<Uuid>, AppError> {
        if actor.role != UserRole::Employee {
            return Ok(Vec::new());
        }
        let profiles = self.client_repo.list_by_employee(actor.id).await?;
        Ok(profiles.into_iter().map(|p| p.user_id).collect())
    }

    pub async fn list_users(&self, actor: &Actor) -> Result<Vec<User>, AppError> {
        let owned = self.owned_client_ids(actor).await?;
        let mut users: Vec<User> = self
            .user_repo
            .list_all()
            .await?
            .into_iter()
            .filter(|u| is_user_visible(actor, u, &owned))
            .collect();

        // Maior nível primeiro; dentro do nível, a ordem do banco
        users.sort_by_key(|u| std::cmp::Reverse(u.role.level()));
        Ok(users)
    }

    pub async fn get_user(&self, actor: &Actor, id: Uuid) -> Result<User, AppError> {
        let user = self.user_repo.find_by_id(id).await?.ok_or(AppError::NotFound("user"))?;
        let owned = self.owned_client_ids(actor).await?;
        role_policy::ensure(is_user_visible(actor, &user, &owned))?;
        Ok(user)
    }

    // Só o SUPERADMIN muda papéis, e nunca para SUPERADMIN
    pub async fn update_role(&self, actor: &Actor, id: Uuid, role: UserRole) -> Result<User, AppError> {
        role_policy::ensure(actor.role == UserRole::Superadmin)?;
        if role == UserRole::Superadmin {
            return Err(AppError::InvalidField { field: "role", code: "invalid_role" });
        }

        let user = self
            .user_repo
            .update_role(id, role)
            .await?
            .ok_or(AppError::NotFound("user"))?;

        tracing::info!(user_id = %id, role = %role, "Papel alterado");
        Ok(user)
    }

    pub async fn deactivate(&self, actor: &Actor, id: Uuid) -> Result<User, AppError> {
        role_policy::ensure(actor.role == UserRole::Superadmin)?;
        if id == actor.id {
            return Err(AppError::InvalidField { field: "id", code: "cannot_deactivate_self" });
        }

        let user = self
            .user_repo
            .deactivate(id)
            .await?
            .ok_or(AppError::NotFound("user"))?;

        tracing::info!(user_id = %id, "Usuário desativado");
        Ok(user)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;

    pub(crate) fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            email: format!("{}@alo.test", Uuid::new_v4()),
            password_hash: String::new(),
            full_name: "Test User".into(),
            phone: None,
            role,
            is_active: true,
            created_by: None,
            password_changed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn employee_sees_only_owned_clients() {
        let employee = user(UserRole::Employee);
        let actor = Actor::from(&employee);
        let mine = user(UserRole::Client);
        let other = user(UserRole::Client);

        assert!(is_user_visible(&actor, &mine, &[mine.id]));
        assert!(!is_user_visible(&actor, &other, &[mine.id]));
        assert!(is_user_visible(&actor, &employee, &[]));
        assert!(!is_user_visible(&actor, &user(UserRole::Manager), &[]));
    }

    #[test]
    fn manager_sees_staff_below_and_clients() {
        let actor = Actor::from(&user(UserRole::Manager));
        assert!(is_user_visible(&actor, &user(UserRole::Employee), &[]));
        assert!(is_user_visible(&actor, &user(UserRole::Client), &[]));
        assert!(!is_user_visible(&actor, &user(UserRole::Superadmin), &[]));
        assert!(!is_user_visible(&actor, &user(UserRole::Consultant), &[]));
    }
}
