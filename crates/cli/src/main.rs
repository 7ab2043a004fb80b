//! SellDesk CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! selldesk migrate
//!
//! # Import products from a YAML file
//! selldesk catalog import products.yaml
//!
//! # Move an order along
//! selldesk order status 42 shipped
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `catalog import` - Insert products from YAML
//! - `order status` - Change an order's status

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use selldesk_core::{OrderId, OrderStatus};

mod commands;

#[derive(Parser)]
#[command(name = "selldesk")]
#[command(author, version, about = "SellDesk CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Manage the product catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Manage orders
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Insert products from a YAML file
    Import {
        /// Path to the YAML file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Change the status of an order
    Status {
        /// Order ID
        id: OrderId,

        /// New status (`placed`, `shipped`, `delivered`, `cancelled`)
        status: OrderStatus,
    },
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
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Catalog { action } => match action {
            CatalogAction::Import { file } => {
                let count = commands::catalog::import(&file).await?;
                tracing::info!(count, "Catalog import complete");
            }
        },
        Commands::Order { action } => match action {
            OrderAction::Status { id, status } => {
                commands::order::set_status(id, status).await?;
            }
        },
    }
    Ok(())
}
