// WebSocket handlers and websocket-specific helpers.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::StreamExt;
use lobby_shared::{ClientMsg, ServerMsg};
use owo_colors::OwoColorize;
use tokio::sync::mpsc;

use crate::server::presence::PresenceCoordinator;
use crate::server::session::ConnectionId;
use crate::server::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Runs disconnect cleanup if the socket task is dropped before it reaches
/// its own cleanup (e.g. server shutdown aborting connection tasks).
struct DisconnectGuard {
    presence: Arc<PresenceCoordinator>,
    id: ConnectionId,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let presence = Arc::clone(&self.presence);
        let id = self.id;
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                presence.disconnect(id).await;
            });
        }
    }
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMsg>();
    let presence = Arc::clone(&state.presence);
    let id = presence.connect(tx);
    let _guard = DisconnectGuard {
        presence: Arc::clone(&presence),
        id,
    };

    let hello = format!("{} {}", "[CONNECT]".bold().green(), id.bold());
    tracing::info!(%hello);

    if send_ws(&mut socket, &ServerMsg::Welcome { connection: id.to_string() })
        .await
        .is_err()
    {
        presence.disconnect(id).await;
        return;
    }

    loop {
        tokio::select! {
            biased;

            // Lobby updates fanned out to this connection
            outgoing = rx.recv() => {
                match outgoing {
                    Some(sm) => {
                        if send_ws(&mut socket, &sm).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            // Incoming websocket messages from this client
            msg = socket.next() => {
                match msg {
                    Some(Ok(Message::Text(txt))) => {
                        match serde_json::from_str::<ClientMsg>(&txt) {
                            Ok(cm) => {
                                if process_client_msg(&presence, &mut socket, id, cm).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::warn!(connection = %id, error = %e, "failed to parse incoming ClientMsg JSON");
                                tracing::debug!(raw_in = %txt);
                                if send_ws(&mut socket, &ServerMsg::Error("Malformed ClientMsg JSON".into())).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
        }
    }

    presence.disconnect(id).await;
    let bye = format!("{} {}", "[DISCONNECT]".bold().red(), id.bold());
    tracing::info!(%bye);
}

async fn send_ws(socket: &mut WebSocket, msg: &ServerMsg) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(txt) => socket.send(Message::Text(txt)).await,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize ServerMsg for websocket send");
            Ok(())
        }
    }
}

async fn process_client_msg(
    presence: &PresenceCoordinator,
    socket: &mut WebSocket,
    id: ConnectionId,
    cm: ClientMsg,
) -> Result<(), axum::Error> {
    tracing::debug!(connection = %id, ws_received_client_msg = ?cm);
    match cm {
        ClientMsg::JoinLobby { username, lobby } => {
            // Success is visible through the lobby broadcast.
            if let Err(e) = presence.join(id, &username, &lobby).await {
                tracing::warn!(connection = %id, lobby = %lobby, error = %e, "join rejected");
                send_ws(socket, &ServerMsg::Error(e.to_string())).await?;
            }
        }
        ClientMsg::LeaveLobby => {
            // The empty update for the leaver arrives through the outbound queue.
            if let Err(e) = presence.leave(id).await {
                tracing::warn!(connection = %id, error = %e, "leave failed");
                send_ws(socket, &ServerMsg::Error(e.to_string())).await?;
            }
        }
        ClientMsg::Ping => send_ws(socket, &ServerMsg::Pong).await?,
    }
    Ok(())
}
