use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::store::schema::SCHEMA_SQL;

pub(crate) mod auth;
pub(crate) mod config;
pub(crate) mod error;
pub(crate) mod models;
pub(crate) mod server;
pub(crate) mod services;
pub(crate) mod store;


/// Crowd and status board for venues, backed by a hosted database.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Print the SQL for the tables the server expects.
    Schema,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve) {
        Command::Schema => print!("{SCHEMA_SQL}"),
        Command::Serve => {
            let mut config = AppConfig::from_yaml_file(&cli.config)?;
            config.apply_env_overrides();
            server::run_all(&config).await?;
        }
    }

    Ok(())
}
