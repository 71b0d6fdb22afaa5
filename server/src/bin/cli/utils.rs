use std::io::IsTerminal;

use lobby_shared::{LobbySnapshot, ServerMsg};
use rand::Rng;

use lobby_server::pretty::{format_server_msg, format_snapshot};

pub struct MessagePrinter {
    json: bool,
    color: bool,
    lobby: String,
    last_members: Option<Vec<String>>,
}

impl MessagePrinter {
    pub fn new(json: bool, lobby: impl Into<String>) -> Self {
        Self {
            json,
            color: std::io::stdout().is_terminal(),
            lobby: lobby.into(),
            last_members: None,
        }
    }

    pub fn handle(&mut self, msg: &ServerMsg) {
        if let ServerMsg::LobbyUpdate(members) = msg {
            // Identical consecutive snapshots are not worth a line.
            if self.last_members.as_ref() == Some(members) {
                return;
            }
            self.last_members = Some(members.clone());
        }
        if self.json {
            match serde_json::to_string(msg) {
                Ok(s) => println!("{}", s),
                Err(e) => eprintln!("Failed to serialize message: {}", e),
            }
        } else {
            println!("{}", format_server_msg(msg, &self.lobby, self.color));
        }
    }
}

pub fn output_snapshot(snapshot: &LobbySnapshot, json: bool) {
    if json {
        match serde_json::to_string_pretty(snapshot) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("Failed to serialize snapshot: {}", e),
        }
    } else {
        println!(
            "{}",
            format_snapshot(snapshot, std::io::stdout().is_terminal())
        );
    }
}

/// Guest display name for users who did not pick one, e.g. `guest-4821`.
pub fn generate_guest_name() -> String {
    let n: u16 = rand::rng().random_range(1000..10000);
    format!("guest-{}", n)
}
