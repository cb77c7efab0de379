pub mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "sponsorship-api")]
#[command(about = "Reservation and sponsorship backend")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, default_value = "config.yaml", help = "Path of the YAML configuration")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve,

    #[command(about = "Create an account, e.g. the admin account")]
    CreateUser {
        #[arg(long, help = "Account name")]
        name: String,
        #[arg(long, help = "Password (12 to 64 characters)")]
        password: String,
    },
}

/// Log level from `RUST_LOG` when set, the configured one otherwise
pub fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    // .env may carry DATABASE_URL and the overrides read by the config
    let _ = dotenvy::dotenv();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("can't load configuration from {}", cli.config.display()))?;
    init_tracing(&config);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::serve::handle(config).await,
        Commands::CreateUser { name, password } => {
            commands::user::create(&config, &name, &password).await
        }
    }
}
