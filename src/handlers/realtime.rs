// src/handlers/realtime.rs

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    services::realtime::SessionRegistry,
};

// Navegadores não mandam Authorization no handshake: o token vem na query
#[derive(Debug, Deserialize)]
pub struct LiveParams {
    pub token: String,
}

// GET /ws?token=<jwt>
pub async fn live_socket(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(params): Query<LiveParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let user = app_state
        .auth_service
        .validate_token(&params.token)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    if !user.is_active {
        return Err(AppError::AccountDisabled.to_api_error(&locale, app_state.i18n_store));
    }

    let sessions = app_state.sessions.clone();
    Ok(ws.on_upgrade(move |socket| run_session(socket, sessions, user.id)))
}

/// Repassa os eventos do registro para o socket até um dos lados fechar.
async fn run_session(mut socket: WebSocket, sessions: SessionRegistry, user_id: Uuid) {
    let mut outbound = sessions.register(user_id).await;
    tracing::info!(%user_id, "Sessão ao vivo aberta");

    loop {
        tokio::select! {
            event = outbound.recv() => match event {
                Some(text) => {
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // O canal é só de saída; ping/pong fica com o axum
                Some(Ok(_)) => {}
            },
        }
    }

    drop(outbound);
    sessions.prune(user_id).await;
    let still_connected = sessions.is_connected(user_id).await;
    tracing::info!(%user_id, still_connected, "Sessão ao vivo encerrada");
}
