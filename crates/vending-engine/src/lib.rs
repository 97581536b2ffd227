//! # vending-engine: Transaction Engine and Session Gate
//!
//! Deposits, purchases, resets and catalog changes for the vending backend,
//! behind session authentication and role/ownership checks.
//!
//! ## Request Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       vending-engine                                    │
//! │                                                                         │
//! │  ┌───────────────────────────────────────────────────────────────────┐ │
//! │  │                    VendingService (facade)                        │ │
//! │  └───────┬──────────────────────┬────────────────────────────────────┘ │
//! │          │                      │                                       │
//! │  ┌───────▼────────┐   ┌─────────▼──────────────────────────────────┐   │
//! │  │  SessionGate   │   │  Ledger │ Catalog │ Purchases │ Accounts   │   │
//! │  │  authenticate  │   │                                            │   │
//! │  │  authorize     │   │  run_tx: begin → read → plan → CAS → commit│   │
//! │  └───────┬────────┘   └─────────┬──────────────────────────────────┘   │
//! │          │                      │                                       │
//! │  ┌───────▼────────┐   ┌─────────▼────────┐                             │
//! │  │ SessionStore   │   │  Store (trait)   │                             │
//! │  │ Redis / memory │   │  SqliteStore     │                             │
//! │  └────────────────┘   └──────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,ignore
//! let config = EngineConfig::load()?;
//! let service = VendingService::connect(&config).await?;
//!
//! let login = service.login("buyer", "secret").await?;
//! let token = &login.session_token;
//! let id = &login.account.id;
//!
//! service.deposit(token, id, 50).await?;
//! let result = service.buy(token, id, &product_id, 1).await?;
//! ```

pub mod accounts;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod password;
pub mod purchase;
pub mod service;
pub mod session;
pub mod tx;

pub use accounts::AccountService;
pub use auth::{BearerAuthority, Claims};
pub use catalog::Catalog;
pub use config::{ConfigError, EngineConfig};
pub use error::{EngineError, EngineResult, ErrorKind, ErrorResponse};
pub use gate::{authorize, SessionGate};
pub use ledger::Ledger;
pub use password::PasswordHasher;
pub use purchase::Purchases;
pub use service::{LoginOutcome, VendingService};
pub use session::{MemorySessionStore, RedisSessionStore, Session, SessionError, SessionStore};
pub use tx::TxPolicy;
