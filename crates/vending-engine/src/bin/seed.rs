//! # Seed Data Generator
//!
//! Populates the database with a demo seller, a few products and a demo
//! buyer for development.
//!
//! ## Usage
//! ```bash
//! # Default database (DATABASE_PATH or ./vending.db)
//! cargo run -p vending-engine --bin seed
//!
//! # Specify database path
//! cargo run -p vending-engine --bin seed -- --db ./data/vending.db
//! ```
//!
//! Accounts that already exist are left alone, and products are only
//! created when the catalog is empty, so the seed can be re-run safely.

use anyhow::Context;
use std::env;
use tracing_subscriber::EnvFilter;
use vending_core::{Coins, NewProduct};
use vending_engine::{EngineConfig, ErrorKind, VendingService};

const SELLER: (&str, &str) = ("demo-seller", "seller-pass");
const BUYER: (&str, &str) = ("demo-buyer", "buyer-pass");

/// Name, price, stock
const PRODUCTS: &[(&str, i64, i64)] = &[
    ("Cola 330ml", 25, 10),
    ("Sparkling Water", 15, 20),
    ("Salted Chips", 35, 8),
    ("Chocolate Bar", 40, 12),
    ("Orange Juice", 55, 6),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut config = EngineConfig::load().context("Invalid configuration")?;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Vending Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: DATABASE_PATH or ./vending.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    tracing::info!(database = %config.database_path, "Seeding vending database");

    let service = VendingService::connect(&config)
        .await
        .context("Failed to start vending engine")?;

    ensure_account(&service, SELLER, "seller").await?;
    ensure_account(&service, BUYER, "buyer").await?;

    let existing = service.list_products().await?;
    if !existing.is_empty() {
        tracing::warn!(
            count = existing.len(),
            "Catalog already has products, skipping product seed"
        );
        return Ok(());
    }

    let login = service.login(SELLER.0, SELLER.1).await?;
    for (name, price, stock) in PRODUCTS {
        let product = service
            .create_product(
                &login.session_token,
                NewProduct {
                    name: name.to_string(),
                    price: Coins::new(*price),
                    stock: *stock,
                },
            )
            .await
            .with_context(|| format!("Failed to create product {name}"))?;

        tracing::info!(product_id = %product.id, name = %product.name, "Seeded product");
    }

    tracing::info!(products = PRODUCTS.len(), "Seed complete");
    Ok(())
}

/// Registers the account unless the username is already taken.
async fn ensure_account(
    service: &VendingService,
    (username, password): (&str, &str),
    role: &str,
) -> anyhow::Result<()> {
    match service.register(username, password, Some(role)).await {
        Ok(account) => {
            tracing::info!(account_id = %account.id, username, role, "Seeded account");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::ConstraintViolation => {
            tracing::info!(username, "Account already exists");
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context(format!("Failed to register {username}"))),
    }
}

/// Log output goes to stderr. `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vending=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
