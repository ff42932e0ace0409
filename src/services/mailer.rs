// src/services/mailer.rs

use async_trait::async_trait;

use crate::{common::error::AppError, models::auth::UserRole};

/// Mensagem simples com as credenciais de acesso.
#[derive(Debug, Clone)]
pub struct CredentialsMail<'a> {
    pub to: &'a str,
    pub full_name: &'a str,
    pub role: UserRole,
    /// Vai no corpo do e-mail; nunca deve aparecer no log.
    pub temporary_password: &'a str,
}

impl CredentialsMail<'_> {
    pub fn subject(&self) -> &'static str {
        "Vos identifiants ALO"
    }

    /// Corpo em texto puro, o mesmo para qualquer implementação de `Mailer`.
    pub fn body(&self) -> String {
        format!(
            "Bonjour {},\n\nVotre compte ({}) a été créé.\nIdentifiant : {}\nMot de passe temporaire : {}\n\nMerci de le changer à la première connexion.",
            self.full_name, self.role, self.to, self.temporary_password
        )
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_credentials(&self, mail: CredentialsMail<'_>) -> Result<(), AppError>;
}

// Envio "de mentira": só registra no log. Desligado com MAIL_ENABLED=false.
pub struct LogMailer {
    enabled: bool,
}

impl LogMailer {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_credentials(&self, mail: CredentialsMail<'_>) -> Result<(), AppError> {
        if !self.enabled {
            return Err(anyhow::anyhow!("envio de e-mail desativado").into());
        }

        let body = mail.body();
        tracing::info!(
            to = mail.to,
            role = %mail.role,
            subject = mail.subject(),
            body_chars = body.chars().count(),
            "📧 Credenciais enviadas para {}",
            mail.full_name
        );
        Ok(())
    }
}

/// Envio best-effort: a falha vira `false` e um aviso no log, nunca um erro.
pub async fn deliver_credentials(mailer: &dyn Mailer, mail: CredentialsMail<'_>) -> bool {
    let to = mail.to.to_string();
    match mailer.send_credentials(mail).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(to = %to, "Falha ao enviar e-mail de credenciais: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail() -> CredentialsMail<'static> {
        CredentialsMail {
            to: "client@mail.com",
            full_name: "Moussa Traoré",
            role: UserRole::Client,
            temporary_password: "Tmp-12345",
        }
    }

    #[test]
    fn body_carries_login_and_temporary_password() {
        let body = mail().body();
        assert!(body.contains("Moussa Traoré"));
        assert!(body.contains("client@mail.com"));
        assert!(body.contains("Tmp-12345"));
    }

    #[tokio::test]
    async fn delivery_failure_is_reported_as_false() {
        assert!(!deliver_credentials(&LogMailer::new(false), mail()).await);
    }

    #[tokio::test]
    async fn enabled_mailer_reports_success() {
        assert!(deliver_credentials(&LogMailer::new(true), mail()).await);
    }
}
