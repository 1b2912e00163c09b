//! Cadence CLI - Recurring-charge detector
//!
//! Usage:
//!   cadence init                    Initialize database
//!   cadence import --file CSV       Import transactions
//!   cadence detect                  Detect subscriptions
//!   cadence summary                 Monthly and yearly totals
//!   cadence serve --port 3000       Start web server

mod cli;
mod commands;


use anyhow::Result;
use cadence_core::models::SubscriptionStatus;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Import { file, format } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_import(&db, &file, format.as_deref()).map(|_| ())
        }
        Commands::Detect { limit, dry_run } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_detect(&db, &config, limit, dry_run)
        }
        Commands::Subscriptions { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(SubscriptionsAction::List) => commands::cmd_subscriptions_list(&db),
                Some(SubscriptionsAction::Increases) => {
                    commands::cmd_subscriptions_increases(&db)
                }
                Some(SubscriptionsAction::Cancel { id }) => {
                    commands::cmd_subscriptions_set_status(&db, &id, SubscriptionStatus::Cancelled)
                }
                Some(SubscriptionsAction::Pause { id }) => {
                    commands::cmd_subscriptions_set_status(&db, &id, SubscriptionStatus::Paused)
                }
                Some(SubscriptionsAction::Resume { id }) => {
                    commands::cmd_subscriptions_set_status(&db, &id, SubscriptionStatus::Active)
                }
                Some(SubscriptionsAction::Delete { id }) => {
                    commands::cmd_subscriptions_delete(&db, &id)
                }
            }
        }
        Commands::Summary => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_summary(&db, &config)
        }
        Commands::Serve {
            port,
            host,
            allowed_origins,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_serve(
                &cli.db,
                &host,
                port,
                cli.no_encrypt,
                config,
                allowed_origins,
            )
            .await
        }
    }
}
