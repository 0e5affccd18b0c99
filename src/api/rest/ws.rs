use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::api::rest::extract::ApiQuery;
use crate::auth::CredentialVerifier;
use crate::error::AppError;
use crate::models::identity::Identity;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<WsParams>,
) -> Result<impl IntoResponse, AppError> {
    let token = params
        .token
        .ok_or_else(|| AppError::Unauthorized("missing token".to_string()))?;
    let identity = state.sessions.verify(&token)?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, identity)))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, identity: Identity) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.notification_events_tx.subscribe();

    info!(user_id = %identity.id, "websocket client connected");

    let send_task = tokio::spawn(async move {
        loop {
            let notification = match rx.recv().await {
                Ok(notification) => notification,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "websocket subscriber lagged");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            if notification.user_id != identity.id {
                continue;
            }

            let json = match serde_json::to_string(&notification) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize notification for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!(user_id = %identity.id, "websocket client disconnected");
}
