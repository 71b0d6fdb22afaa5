mod cli;

use anyhow::anyhow;
use clap::Parser;
use cli::{Cli, Commands, MessagePrinter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Join { name, lobby } => {
            let name = name.unwrap_or_else(cli::generate_guest_name);
            if !cli.json {
                eprintln!("Joining '{}' as '{}' (Ctrl-C to leave)", lobby, name);
            }
            let mut printer = MessagePrinter::new(cli.json, lobby.clone());
            cli::join_and_watch(&cli.server, &name, &lobby, &mut printer).await?;
        }
        Commands::Members { lobby } => match cli::fetch_members(&cli.server, &lobby).await? {
            Some(snapshot) => cli::output_snapshot(&snapshot, cli.json),
            None => return Err(anyhow!("lobby '{}' does not exist", lobby)),
        },
        Commands::Ping { wait_ms } => {
            let mut printer = MessagePrinter::new(cli.json, String::new());
            if !cli::ping_ws(&cli.server, wait_ms, &mut printer).await? {
                return Err(anyhow!("no pong from {} within {} ms", cli.server, wait_ms));
            }
        }
    }

    Ok(())
}
