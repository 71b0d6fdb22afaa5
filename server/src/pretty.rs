//! Human-readable rendering of server messages for terminals.

use lobby_shared::{LobbySnapshot, ServerMsg};
use owo_colors::OwoColorize;

/// One-line rendering of a membership list, e.g. `3 members: alice, bob, carol`.
pub fn format_members(members: &[String], color: bool) -> String {
    let count = match members.len() {
        0 => "no members".to_string(),
        1 => "1 member".to_string(),
        n => format!("{} members", n),
    };
    if members.is_empty() {
        return if color {
            count.dimmed().to_string()
        } else {
            count
        };
    }
    let names: Vec<String> = members
        .iter()
        .map(|m| {
            if color {
                m.bold().to_string()
            } else {
                m.clone()
            }
        })
        .collect();
    format!("{}: {}", count, names.join(", "))
}

pub fn format_snapshot(snapshot: &LobbySnapshot, color: bool) -> String {
    let lobby = if color {
        snapshot.lobby.cyan().bold().to_string()
    } else {
        snapshot.lobby.clone()
    };
    format!("[{}] {}", lobby, format_members(&snapshot.members, color))
}

/// Render any server message for a terminal.
pub fn format_server_msg(msg: &ServerMsg, lobby: &str, color: bool) -> String {
    match msg {
        ServerMsg::Welcome { connection } => {
            let tag = "[CONNECTED]";
            if color {
                format!("{} as {}", tag.green().bold(), connection.dimmed())
            } else {
                format!("{} as {}", tag, connection)
            }
        }
        ServerMsg::LobbyUpdate(members) => format_snapshot(
            &LobbySnapshot {
                lobby: lobby.to_string(),
                members: members.clone(),
            },
            color,
        ),
        ServerMsg::Error(e) => {
            if color {
                format!("{} {}", "[ERROR]".red().bold(), e)
            } else {
                format!("[ERROR] {}", e)
            }
        }
        ServerMsg::Pong => "pong".to_string(),
    }
}
