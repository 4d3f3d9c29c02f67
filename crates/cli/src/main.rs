//! Bookshelf CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! bookshelf-cli migrate
//!
//! # Load demo categories, books and a customer
//! bookshelf-cli seed
//!
//! # Create a user (add --admin for admin endpoints)
//! bookshelf-cli user create -e admin@example.com -n "Admin Name" --admin
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bookshelf-cli")]
#[command(version, about = "Bookshelf CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database with demo catalog data
    Seed,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Grant access to the admin endpoints
        #[arg(long)]
        admin: bool,
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

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    let pool = commands::connect().await?;
    match cli.command {
        Commands::Migrate => commands::migrate::run(&pool).await?,
        Commands::Seed => commands::seed::run(&pool).await?,
        Commands::User { action } => match action {
            UserAction::Create { email, name, admin } => {
                commands::user::create(&pool, &email, &name, admin).await?;
            }
        },
    }
    Ok(())
}
