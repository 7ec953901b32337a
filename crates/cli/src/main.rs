//! Wagwell CLI - Database migrations and session maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! wagwell-cli migrate
//!
//! # Delete expired sessions (carts, first-access flags)
//! wagwell-cli sessions purge
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "wagwell-cli")]
#[command(author, version, about = "Wagwell storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Maintain the session store
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },
}

#[derive(Subcommand)]
enum SessionsAction {
    /// Delete expired sessions
    Purge,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Sessions { action } => match action {
            SessionsAction::Purge => commands::sessions::purge().await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_sessions_purge() {
        let cli = Cli::try_parse_from(["wagwell-cli", "sessions", "purge"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Sessions {
                action: SessionsAction::Purge
            })
        ));
    }
}
