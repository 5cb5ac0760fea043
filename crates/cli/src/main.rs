//! SQL agent gateway CLI - operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Hash a password for the admins table (reads the password from stdin)
//! echo -n 'secret' | sqlagent-cli password hash --cost 12
//!
//! # Check an account the way /login would see it
//! sqlagent-cli admin check -e admin@example.com
//! echo -n 'secret' | sqlagent-cli admin check -e admin@example.com --verify-password
//!
//! # Seed and inspect agent memory
//! sqlagent-cli memory add -c business_rules "Revenue excludes refunded orders"
//! sqlagent-cli memory import rules.yaml
//! sqlagent-cli memory list -n 50
//! ```
//!
//! # Commands
//!
//! - `password hash` - Print a bcrypt hash
//! - `admin check` - Read-only credential store lookup
//! - `memory add|import|list` - Manage the agent memory store

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sqlagent-cli")]
#[command(author, version, about = "SQL agent gateway CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Password utilities
    Password {
        #[command(subcommand)]
        action: PasswordAction,
    },
    /// Inspect admin accounts (read-only)
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Manage the agent memory store
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },
}

#[derive(Subcommand)]
enum PasswordAction {
    /// Hash a password read from stdin
    Hash {
        /// bcrypt work factor (4-31)
        #[arg(long, default_value_t = sqlagent_server::services::auth::DEFAULT_COST)]
        cost: u32,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Report whether an account exists and is enabled
    Check {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Also verify a password read from stdin
        #[arg(long)]
        verify_password: bool,
    },
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Save a text memory
    Add {
        /// Memory category (e.g. `business_rules`)
        #[arg(short, long)]
        category: Option<String>,

        /// Memory text
        text: String,
    },
    /// Save every memory listed in a YAML file
    Import {
        /// Path to the YAML file
        file: String,
    },
    /// List recent memories
    List {
        /// Maximum number of memories to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Password { action } => match action {
            PasswordAction::Hash { cost } => commands::password::hash(cost)?,
        },
        Commands::Admin { action } => match action {
            AdminAction::Check {
                email,
                verify_password,
            } => commands::admin::check(&email, verify_password).await?,
        },
        Commands::Memory { action } => match action {
            MemoryAction::Add { category, text } => {
                commands::memory::add(&text, category.as_deref()).await?;
            }
            MemoryAction::Import { file } => commands::memory::import(&file).await?,
            MemoryAction::List { limit } => commands::memory::list(limit).await?,
        },
    }
    Ok(())
}
