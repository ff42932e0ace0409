// src/common/i18n.rs

use std::collections::HashMap;
use std::sync::OnceLock;

pub const DEFAULT_LANG: &str = "fr";
pub const SUPPORTED_LANGS: [&str; 3] = ["fr", "en", "pt"];

// (chave, fr, en, pt)
const MESSAGES: &[(&str, &str, &str, &str)] = &[
    (
        "error.validation",
        "Un ou plusieurs champs sont invalides.",
        "One or more fields are invalid.",
        "Um ou mais campos são inválidos.",
    ),
    (
        "error.email_exists",
        "Cet e-mail est déjà utilisé.",
        "This e-mail is already in use.",
        "Este e-mail já está em uso.",
    ),
    (
        "error.invalid_credentials",
        "E-mail ou mot de passe invalide.",
        "Invalid e-mail or password.",
        "E-mail ou senha inválidos.",
    ),
    (
        "error.account_disabled",
        "Ce compte est désactivé.",
        "This account is disabled.",
        "Esta conta está desativada.",
    ),
    (
        "error.invalid_token",
        "Jeton d'authentification invalide ou absent.",
        "Authentication token is invalid or missing.",
        "Token de autenticação inválido ou ausente.",
    ),
    (
        "error.permission_denied",
        "Vous n'avez pas la permission d'effectuer cette action.",
        "You are not allowed to perform this action.",
        "Você não tem permissão para realizar esta ação.",
    ),
    (
        "error.not_found",
        "Ressource introuvable.",
        "Resource not found.",
        "Recurso não encontrado.",
    ),
    (
        "error.code_mismatch",
        "Code de confirmation invalide.",
        "Invalid confirmation code.",
        "Código de confirmação inválido.",
    ),
    (
        "error.payment_processed",
        "Ce paiement a déjà été traité.",
        "This payment has already been processed.",
        "Este pagamento já foi processado.",
    ),
    (
        "error.prospect_converted",
        "Ce prospect a déjà été converti en client.",
        "This prospect has already been converted into a client.",
        "Este prospect já foi convertido em cliente.",
    ),
    (
        "error.superadmin_exists",
        "Un SUPERADMIN existe déjà : la clé secrète est requise.",
        "A SUPERADMIN already exists: the secret key is required.",
        "Já existe um SUPERADMIN: a chave secreta é obrigatória.",
    ),
    (
        "error.sequential_violation",
        "Les étapes doivent progresser une par une.",
        "Steps must progress one at a time.",
        "As etapas devem avançar uma de cada vez.",
    ),
    (
        "error.step_out_of_range",
        "Étape hors du workflow.",
        "Step is outside the workflow.",
        "Etapa fora do workflow.",
    ),
    (
        "error.internal",
        "Une erreur inattendue est survenue.",
        "An unexpected error occurred.",
        "Ocorreu um erro inesperado.",
    ),
];

/// Catálogo de mensagens por idioma.
pub struct I18nStore {
    messages: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl I18nStore {
    pub fn new() -> Self {
        let mut messages: HashMap<&'static str, HashMap<&'static str, &'static str>> =
            HashMap::new();

        for &(key, fr, en, pt) in MESSAGES {
            messages.entry("fr").or_default().insert(key, fr);
            messages.entry("en").or_default().insert(key, en);
            messages.entry("pt").or_default().insert(key, pt);
        }

        Self { messages }
    }

    pub fn global() -> &'static I18nStore {
        static STORE: OnceLock<I18nStore> = OnceLock::new();
        STORE.get_or_init(I18nStore::new)
    }

    /// Traduz a chave; cai para o idioma padrão e, por fim, para a própria chave.
    pub fn translate(&self, lang: &str, key: &str) -> String {
        self.messages
            .get(lang)
            .and_then(|table| table.get(key))
            .or_else(|| self.messages.get(DEFAULT_LANG).and_then(|table| table.get(key)))
            .map(|msg| msg.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_french_then_key() {
        let store = I18nStore::new();
        assert_eq!(store.translate("en", "error.not_found"), "Resource not found.");
        assert_eq!(store.translate("de", "error.not_found"), "Ressource introuvable.");
        assert_eq!(store.translate("en", "error.unknown"), "error.unknown");
    }
}
