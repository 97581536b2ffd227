//! # vending-db: Database Layer for the Vending Backend
//!
//! SQLite storage behind the `vending_core::Store` traits.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Vending Backend Data Flow                         │
//! │                                                                         │
//! │  vending-engine (Ledger, Catalog, Purchase)                            │
//! │       │  Arc<dyn Store>                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     vending-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  account.rs   │    │  (embedded)  │  │   │
//! │  │   │               │◄───│  product.rs   │    │ 001_init.sql │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │                                                     │   │
//! │  │   ┌───────▼───────┐                                             │   │
//! │  │   │  SqliteStore  │  Store / StoreTx (store.rs)                 │   │
//! │  │   └───────────────┘                                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL)                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Account and product repositories
//! - [`store`] - The `Store` adapter used by the engine
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vending_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("vending.db")).await?;
//! let store = std::sync::Arc::new(db.store());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use store::{SqliteStore, SqliteTx};

// Repository re-exports for convenience
pub use repository::account::AccountRepository;
pub use repository::product::ProductRepository;
