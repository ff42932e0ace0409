// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::common::i18n::{DEFAULT_LANG, SUPPORTED_LANGS};

// Extrator de idioma (Accept-Language), usado para traduzir os erros
#[derive(Debug, Clone)]
pub struct Locale(pub String);

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LANG.to_string())
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let lang = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|header_value| header_value.to_str().ok())
            .and_then(|header_str| {
                // Primeiro idioma suportado na ordem de preferência ("en-US" -> "en")
                accept_language::parse(header_str)
                    .into_iter()
                    .map(|tag| tag.split('-').next().unwrap_or_default().to_lowercase())
                    .find(|lang| SUPPORTED_LANGS.contains(&lang.as_str()))
            });

        Ok(lang.map(Locale).unwrap_or_default())
    }
}
