// HTTP handlers for the lobby server.
//
// Read-only views over the membership store; all mutations go through the
// websocket transport.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use lobby_shared::{LobbySnapshot, ServerMsg};

use crate::server::AppState;

/// Current members of one lobby.
///
/// `GET /api/lobbies/{name}` → `{ "lobby": "abc", "members": ["alice"] }`,
/// 404 if the lobby was never created, 503 if the store is unavailable.
pub async fn lobby_members_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.presence.members(&name).await {
        Ok(Some(members)) => (
            StatusCode::OK,
            Json(LobbySnapshot {
                lobby: name,
                members,
            }),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ServerMsg::Error(format!("unknown lobby '{}'", name))),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(lobby = %name, error = %e, "members lookup failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ServerMsg::Error(e.to_string())),
            )
                .into_response()
        }
    }
}
