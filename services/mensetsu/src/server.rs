//! Client-facing WebSocket endpoint. One orchestrator task per socket;
//! the socket loop only decodes frames and pumps messages, all session
//! logic lives in the orchestrator.

use crate::backend::ConnectionFactory;
use crate::orchestrator::SessionOrchestrator;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::store::SessionStore;
use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub factory: Arc<dyn ConnectionFactory>,
    pub store: Arc<dyn SessionStore>,
}

pub fn router(state: AppState) -> Router {
    // Permissive CORS so a separately-served frontend can connect.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state)
}

async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    tracing::info!("websocket upgrade request received");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (server_tx, mut server_rx) = mpsc::channel::<ServerMessage>(256);
    let (client_tx, client_rx) = mpsc::channel::<ClientMessage>(64);

    let (orchestrator, agent_rx) =
        match SessionOrchestrator::new(state.factory, state.store, server_tx) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!("failed to build session: {:#}", e);
                return;
            }
        };
    let session_id = orchestrator.session_id();
    tracing::info!(%session_id, "websocket connection established");
    let session = tokio::spawn(orchestrator.run(client_rx, agent_rx));

    let (mut ws_tx, mut ws_rx) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(msg) = server_rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if ws_tx.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("failed to serialize server message: {}", e);
                }
            }
        }
    });

    while let Some(msg) = ws_rx.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::info!(%session_id, "websocket error: {}", e);
                break;
            }
        };
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                Ok(parsed) => {
                    if client_tx.send(parsed).await.is_err() {
                        break;
                    }
                }
                // Malformed frames are logged and dropped; the session
                // continues.
                Err(e) => {
                    tracing::warn!(%session_id, "malformed client message dropped: {}", e);
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Dropping the inbound sender is the disconnect signal; the
    // orchestrator closes its agent connections and discards state.
    drop(client_tx);
    if let Err(e) = session.await {
        tracing::warn!(%session_id, "session task ended abnormally: {}", e);
    }
    writer.abort();
    tracing::info!(%session_id, "websocket connection closed");
}
