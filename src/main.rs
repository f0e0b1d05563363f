//! Taskbox cli

use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use std::path::PathBuf;
use taskbox::*;
use tracing::info;

const ENV_PREFIX: &str = "TASKBOX";

/// Cli
#[derive(Debug, Parser)]
#[command(name = "taskbox", about = "taskbox server.", version)]
pub struct Cli {
    /// config file path
    #[arg(short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// migrate and start the http server with periodic jobs (default)
    Serve,
    /// apply database migrations
    Migrate,
    /// re-verify pending payments with their gateways
    Reconcile,
    /// compare wallet balances with their ledger
    AuditWallets {
        /// reset drifted balances to the ledger sum
        #[arg(long)]
        fix: bool,
    },
    /// renew or expire due subscriptions
    RenewSubscriptions,
    /// create or update the payment gateway rows
    SetupGateways,
    /// seed the subscription plans
    CreatePlans,
}

#[actix_web::main]
async fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "INFO");
    }
    // try to load config from .env
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let args = Cli::parse();
    let state: AppState = AppState::create(args.config, Some(ENV_PREFIX.to_string())).await?;
    let service = &state.service;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            Migrator::up(service.db(), None).await?;
            service.setup_gateways().await?;
            info!("Start taskbox server");
            start(state).await?;
            info!("Server shutdown");
        }
        Command::Migrate => {
            Migrator::up(service.db(), None).await?;
            info!("Migrations applied");
        }
        Command::Reconcile => {
            let jobs = &state.setting.jobs;
            let report = service
                .reconcile_payments(jobs.pending_age, jobs.lookback)
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::AuditWallets { fix } => {
            let drifts = service.audit_wallets(fix).await?;
            println!("{}", serde_json::to_string_pretty(&drifts)?);
        }
        Command::RenewSubscriptions => {
            let report = service.renew_subscriptions().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::SetupGateways => {
            let rows = service.setup_gateways().await?;
            for row in rows {
                println!("{} active={}", row.name, row.is_active);
            }
        }
        Command::CreatePlans => {
            let plans = service.create_plans().await?;
            println!("{}", serde_json::to_string_pretty(&plans)?);
        }
    }
    Ok(())
}
