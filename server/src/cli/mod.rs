use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Server CLI for lobby-server
#[derive(Parser, Debug, Clone)]
#[command(name = "lobby-server", version, about = "Live lobby membership server")]
pub struct ServerCli {
    /// Path to config file
    #[arg(long, default_value = "lobby-server.toml")]
    pub config: PathBuf,

    /// Address to listen on (overrides config.bind)
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// SQLite database file; selects the sqlite backend (overrides config.store)
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Persist CLI overrides back to the config file
    #[arg(long, default_value_t = false)]
    pub persist: bool,

    /// Verbose logging with targets, thread ids and source locations
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}
