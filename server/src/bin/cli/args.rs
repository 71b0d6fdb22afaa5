use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "lobby-cli", version, about = "Headless client for the lobby server", long_about = None)]
pub struct Cli {
    /// Server address. Accepted forms:
    /// - host:port                    (e.g. --server localhost:5001)
    /// - http:// or https:// base URL (e.g. --server http://localhost:5001)
    /// - ws:// or wss:// URL          (e.g. --server ws://localhost:5001/ws)
    #[arg(long, default_value = "http://localhost:5001")]
    pub server: String,

    /// Output JSON instead of human-readable text
    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Join a lobby and print every membership update until interrupted
    Join {
        /// Display name; a guest name is generated when omitted
        #[arg(short, long)]
        name: Option<String>,
        /// Lobby to join (created if it does not exist)
        #[arg(short, long)]
        lobby: String,
    },
    /// Print the current members of a lobby
    Members {
        #[arg(short, long)]
        lobby: String,
    },
    /// Check that the server answers over websocket
    Ping {
        /// How long to wait for the reply (ms)
        #[arg(long, default_value_t = 1200)]
        wait_ms: u64,
    },
}
