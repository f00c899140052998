//! PyroWarden CLI - backend checks, seeding and admin role management.
//!
//! # Usage
//!
//! ```bash
//! # Probe every table the site reads
//! pw-cli check
//!
//! # Load internship postings from YAML
//! pw-cli seed internships --file data/internships.yaml --replace
//!
//! # Manage the admin role
//! pw-cli admin grant -e ops@pyrowarden.com
//! pw-cli admin revoke -e ops@pyrowarden.com
//! pw-cli admin roles -e ops@pyrowarden.com
//! ```
//!
//! Every command needs `SUPABASE_URL`, `SUPABASE_ANON_KEY` and
//! `SUPABASE_SERVICE_ROLE_KEY`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use pyrowarden_core::Email;

mod commands;

#[derive(Parser)]
#[command(name = "pw-cli")]
#[command(author, version, about = "PyroWarden CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check connectivity to every table the site uses
    Check,
    /// Seed the backend with data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage the admin role
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert internship postings from a YAML file
    Internships {
        /// Path to the YAML file
        #[arg(short, long, default_value = commands::seed::DEFAULT_INTERNSHIPS_FILE)]
        file: String,

        /// Delete existing postings with the same title first
        #[arg(long)]
        replace: bool,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Grant the admin role
    Grant {
        #[arg(short, long)]
        email: Email,
    },
    /// Revoke the admin role
    Revoke {
        #[arg(short, long)]
        email: Email,
    },
    /// List a user's roles
    Roles {
        #[arg(short, long)]
        email: Email,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    let ctx = commands::Context::from_env()?;
    match cli.command {
        Commands::Check => commands::check::run(&ctx).await?,
        Commands::Seed { target } => match target {
            SeedTarget::Internships { file, replace } => {
                commands::seed::internships(&ctx, &file, replace).await?;
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Grant { email } => commands::admin::grant(&ctx, &email).await?,
            AdminAction::Revoke { email } => commands::admin::revoke(&ctx, &email).await?,
            AdminAction::Roles { email } => commands::admin::roles(&ctx, &email).await?,
        },
    }
    Ok(())
}
