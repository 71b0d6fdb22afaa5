//! Client-server messaging protocol for lobby presence.
//!
//! Every frame is a JSON object of the form `{ "type": ..., "data": ... }`
//! with kebab-case type names, e.g.
//! `{"type":"join-lobby","data":{"username":"alice","lobby":"abc"}}`.

use serde::{Deserialize, Serialize};

/// Messages that clients can send to the server
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ClientMsg {
    /// Join (or switch to) the named lobby under the given display name.
    JoinLobby { username: String, lobby: String },
    /// Leave the current lobby without closing the connection.
    LeaveLobby,
    Ping,
}

/// Messages that the server can send to clients
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ServerMsg {
    /// Sent once right after the websocket upgrade.
    Welcome { connection: String },
    /// Full membership snapshot of the lobby the receiver is subscribed to.
    /// Replaces whatever list the client held before.
    LobbyUpdate(Vec<String>),
    Error(String),
    Pong,
}

/// Membership of one lobby as returned by the HTTP API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbySnapshot {
    pub lobby: String,
    pub members: Vec<String>,
}

impl ServerMsg {
    /// Member list carried by a `lobby-update`, if this is one.
    pub fn members(&self) -> Option<&[String]> {
        match self {
            ServerMsg::LobbyUpdate(members) => Some(members),
            _ => None,
        }
    }
}
