use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use stalesweep_core::{
    cleanup::{CleanupLogFilter, CleanupType, RunStatus},
    storage::Database,
    AppConfig,
};

mod commands;

#[derive(Parser)]
#[command(name = "stalesweep")]
#[command(author, version, about = "Retention cleanup for stale platform content")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger a manual cleanup run
    Cleanup {
        /// Administrator id recorded as the run's trigger
        #[arg(long)]
        actor: Uuid,
        /// Override the retention threshold for this run only
        #[arg(long)]
        threshold_days: Option<u32>,
    },
    /// Show cleanup run history
    Logs {
        /// Filter by run type (auto|manual)
        #[arg(long)]
        cleanup_type: Option<CleanupType>,
        /// Filter by run status (running|completed|failed)
        #[arg(long)]
        status: Option<RunStatus>,
        /// Only runs started on or after this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Only runs started on or before this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        per_page: u32,
    },
    /// Show aggregate cleanup statistics
    Stats {
        /// Trailing window in days
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
    /// Manage the retention policy
    Policy {
        #[command(subcommand)]
        action: PolicyAction,
    },
    /// Run the scheduler host until interrupted
    Run,
}

#[derive(Subcommand)]
enum PolicyAction {
    /// Show the current policy
    Show,
    /// Set the retention threshold in days
    SetThreshold { days: i64 },
    /// Enable automatic cleanup
    EnableAuto,
    /// Disable automatic cleanup
    DisableAuto,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    // Initialize database
    let db = Arc::new(Database::new(&config).await?);

    match cli.command {
        Commands::Cleanup {
            actor,
            threshold_days,
        } => commands::cleanup::run(db, config, actor, threshold_days).await,
        Commands::Logs {
            cleanup_type,
            status,
            from,
            to,
            page,
            per_page,
        } => {
            let filter = CleanupLogFilter {
                cleanup_type,
                status,
                date_from: from,
                date_to: to,
                page,
                per_page,
            };
            commands::logs::run(&db, &config, filter).await
        }
        Commands::Stats { days } => commands::stats::run(&db, &config, days).await,
        Commands::Policy { action } => match action {
            PolicyAction::Show => commands::policy::show(&db, &config).await,
            PolicyAction::SetThreshold { days } => {
                commands::policy::set_threshold(&db, &config, days).await
            }
            PolicyAction::EnableAuto => commands::policy::enable_auto(&db, &config).await,
            PolicyAction::DisableAuto => commands::policy::disable_auto(&db, &config).await,
        },
        Commands::Run => commands::run::run(db, config).await,
    }
}
