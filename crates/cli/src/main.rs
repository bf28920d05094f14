//! Channel sync CLI - migrations, manual imports and maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! cs-cli migrate
//!
//! # Load channel settings, status mapping and currencies
//! cs-cli seed -f channel.yaml
//!
//! # Import a Salla order saved as JSON (bare order or webhook body)
//! cs-cli import-order -f order.json
//!
//! # Re-run feeds left in error/draft/update
//! cs-cli retry-feeds
//!
//! # Fetch an order from the Salla API; print its feed or import it
//! cs-cli fetch-order --id 2093117510 --import
//!
//! # Refresh the store status catalog
//! cs-cli sync-statuses
//! ```
//!
//! Configuration comes from the same environment variables as the
//! connector, minus `WEBHOOK_SECRET`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use channel_sync_core::ChannelId;

mod commands;

#[derive(Parser)]
#[command(name = "cs-cli")]
#[command(author, version, about = "Channel sync CLI tools")]
struct Cli {
    /// Channel to work on (defaults to `CHANNEL_ID`)
    #[arg(short, long, global = true)]
    channel: Option<i32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load channel settings from a YAML file
    Seed {
        /// Path to the YAML file
        #[arg(short, long)]
        file: String,
    },
    /// Import a Salla order from a JSON file
    ImportOrder {
        /// Path to the JSON file
        #[arg(short, long)]
        file: String,
    },
    /// Retry feeds that did not finish
    RetryFeeds,
    /// Fetch an order from the Salla API
    FetchOrder {
        /// Salla order ID
        #[arg(long)]
        id: String,

        /// Import the order instead of printing its feed
        #[arg(long)]
        import: bool,
    },
    /// Sync the store's order status catalog from the Salla API
    SyncStatuses,
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
    let channel = cli.channel.map(ChannelId::new);
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::channel(&file).await?,
        Commands::ImportOrder { file } => commands::orders::import_file(channel, &file).await?,
        Commands::RetryFeeds => commands::orders::retry(channel).await?,
        Commands::FetchOrder { id, import } => {
            commands::orders::fetch(channel, &id, import).await?;
        }
        Commands::SyncStatuses => commands::statuses::sync(channel).await?,
    }
    Ok(())
}
