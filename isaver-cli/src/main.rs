//! Isaver CLI - Command-line interface
//!
//! Provides command-line access to the Isaver download server.

mod commands;

use clap::Parser;

#[derive(Parser)]
#[command(name = "isaver")]
#[command(about = "A video download and mux server")]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    commands::handle_command(cli.command).await?;

    Ok(())
}
