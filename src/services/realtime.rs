// src/services/realtime.rs

use async_trait::async_trait;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::models::notification::LiveEvent;

/// Canal de saída de um socket conectado.
pub type Outbound = mpsc::UnboundedSender<String>;

/// Envio ao vivo, sem garantia de entrega.
/// Usuário sem sessão aberta: o evento é descartado em silêncio.
#[async_trait]
pub trait RealtimePush: Send + Sync {
    async fn push(&self, user_id: Uuid, event: &str, payload: Value);
}

// Registro de sessões abertas (um usuário pode ter várias abas)
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, Vec<Outbound>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abre uma sessão e devolve o lado de leitura para o socket.
    pub async fn register(&self, user_id: Uuid) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.write().await.entry(user_id).or_default().push(tx);
        tracing::debug!(%user_id, "sessão ao vivo registrada");
        rx
    }

    /// Remove os canais já fechados do usuário.
    pub async fn prune(&self, user_id: Uuid) {
        let mut sessions = self.sessions.write().await;
        if let Some(senders) = sessions.get_mut(&user_id) {
            senders.retain(|tx| !tx.is_closed());
            if senders.is_empty() {
                sessions.remove(&user_id);
            }
        }
    }

    pub async fn is_connected(&self, user_id: Uuid) -> bool {
        self.sessions
            .read()
            .await
            .get(&user_id)
            .is_some_and(|senders| senders.iter().any(|tx| !tx.is_closed()))
    }
}

#[async_trait]
impl RealtimePush for SessionRegistry {
    async fn push(&self, user_id: Uuid, event: &str, payload: Value) {
        let frame = match serde_json::to_string(&LiveEvent { event: event.to_string(), payload }) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Falha ao serializar evento ao vivo: {}", e);
                return;
            }
        };

        let mut stale = false;
        {
            let sessions = self.sessions.read().await;
            let Some(senders) = sessions.get(&user_id) else {
                return;
            };
            for tx in senders {
                if tx.send(frame.clone()).is_err() {
                    stale = true;
                }
            }
        }

        if stale {
            self.prune(user_id).await;
        }
    }
}

/// Implementação vazia, para montar serviços sem camada ao vivo.
#[cfg(test)]
pub struct NoopPush;

#[cfg(test)]
#[async_trait]
impl RealtimePush for NoopPush {
    async fn push(&self, _user_id: Uuid, _event: &str, _payload: Value) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn push_reaches_every_open_session_of_the_user() {
        let registry = SessionRegistry::new();
        let user = Uuid::new_v4();
        let mut first = registry.register(user).await;
        let mut second = registry.register(user).await;

        registry.push(user, "notification", json!({ "title": "Olá" })).await;

        let frame = first.recv().await.expect("frame");
        assert!(frame.contains("\"event\":\"notification\""));
        assert_eq!(second.recv().await.expect("frame"), frame);
    }

    #[tokio::test]
    async fn push_without_session_is_silently_dropped() {
        let registry = SessionRegistry::new();
        registry.push(Uuid::new_v4(), "notification", json!({})).await;
        NoopPush.push(Uuid::new_v4(), "notification", json!({})).await;
    }

    #[tokio::test]
    async fn closed_sessions_are_pruned_on_push() {
        let registry = SessionRegistry::new();
        let user = Uuid::new_v4();
        let rx = registry.register(user).await;
        assert!(registry.is_connected(user).await);

        drop(rx);
        registry.push(user, "notification", json!({})).await;

        assert!(!registry.is_connected(user).await);
        assert!(registry.sessions.read().await.get(&user).is_none());
    }
}
