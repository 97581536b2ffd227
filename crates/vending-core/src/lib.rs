//! # vending-core: Pure Business Logic for the Vending Backend
//!
//! Everything the vending machine decides, with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Vending Backend Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Caller (HTTP layer, CLI, tests)                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ session token + request                │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                     vending-engine                              │   │
//! │  │    SessionGate ──► Ledger / Catalog / Purchase ──► Store tx     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ vending-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   coins   │  │ purchase  │  │  access   │  │   │
//! │  │   │  Account  │  │  Coins    │  │   plan    │  │ authorize │  │   │
//! │  │   │  Product  │  │  Change   │  │  result   │  │  Action   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐                                 │   │
//! │  │   │validation │  │   store   │  (traits only)                  │   │
//! │  │   └───────────┘  └───────────┘                                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 vending-db (SQLite Store adapter)               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Account, Product, Role, Identity
//! - [`coins`] - Coins amount, Denomination set, change calculator
//! - [`purchase`] - Purchase planning and result
//! - [`access`] - Role and ownership rules
//! - [`validation`] - Input validation
//! - [`store`] - Persistence traits implemented by `vending-db`
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use vending_core::{make_change, Coins, Denomination};
//!
//! let change = make_change(Coins::new(25));
//! assert_eq!(change.count(Denomination::Twenty), 1);
//! assert_eq!(change.count(Denomination::Five), 1);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod coins;
pub mod error;
pub mod purchase;
pub mod store;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{authorize, permits, Action};
pub use coins::{make_change, Change, Coins, Denomination};
pub use error::{CoreError, CoreResult, ValidationError};
pub use purchase::{check_stock, plan_purchase, PurchasePlan, PurchaseResult};
pub use store::{NewAccount, Store, StoreError, StoreResult, StoreTx, StoredCredentials};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Shortest accepted username.
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Longest accepted username.
pub const MAX_USERNAME_LENGTH: usize = 50;

/// Longest accepted plaintext password.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Longest accepted product name.
pub const MAX_PRODUCT_NAME_LENGTH: usize = 200;
