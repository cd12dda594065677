//! Vestia CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! vestia migrate
//!
//! # List installed shops
//! vestia sessions list
//!
//! # Remove a shop's session (e.g. after a failed uninstall webhook)
//! vestia sessions delete -s demo-store.myshopify.com
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `sessions list` - List installed shops and their scopes
//! - `sessions delete` - Delete a shop's session

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vestia")]
#[command(author, version, about = "Vestia CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Inspect and manage shop sessions
    Sessions {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// List installed shops
    List,
    /// Delete a shop's session
    Delete {
        /// Shop domain (e.g. demo-store.myshopify.com)
        #[arg(short, long)]
        shop: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Sessions { action } => match action {
            SessionAction::List => commands::sessions::list().await?,
            SessionAction::Delete { shop } => commands::sessions::delete(&shop).await?,
        },
    }
    Ok(())
}
