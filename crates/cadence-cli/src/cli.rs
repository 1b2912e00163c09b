//! CLI argument definitions using clap
//!
//! The command implementations live in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Cadence - Find the charges that keep coming back
#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Recurring-charge detector and subscription cost tracker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "cadence.db", global = true)]
    pub db: PathBuf,

    /// Detection config file (TOML)
    ///
    /// Falls back to CADENCE_CONFIG, then the user data dir, then built-in defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set CADENCE_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import transactions from a CSV or JSON file
    Import {
        /// File to import
        #[arg(short, long)]
        file: PathBuf,

        /// File format: csv or json (guessed from the extension if not specified)
        #[arg(long)]
        format: Option<String>,
    },

    /// Detect recurring charges in recent transactions
    Detect {
        /// Number of most recent transactions to scan
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print what would be detected without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage subscriptions
    Subscriptions {
        #[command(subcommand)]
        action: Option<SubscriptionsAction>,
    },

    /// Show monthly and yearly subscription totals
    Summary,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Allowed CORS origin (repeatable; same-origin only if omitted)
        #[arg(long = "allow-origin")]
        allowed_origins: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum SubscriptionsAction {
    /// List all subscriptions
    List,

    /// Show active subscriptions whose latest charge went up
    Increases,

    /// Mark a subscription as cancelled
    Cancel {
        /// Subscription ID
        id: String,
    },

    /// Mark a subscription as paused
    Pause {
        /// Subscription ID
        id: String,
    },

    /// Mark a paused or cancelled subscription active again
    Resume {
        /// Subscription ID
        id: String,
    },

    /// Delete a subscription
    Delete {
        /// Subscription ID
        id: String,
    },
}
