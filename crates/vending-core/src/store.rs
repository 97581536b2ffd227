//! # Store Traits
//!
//! Storage-agnostic persistence interface. The engine depends only on these
//! traits; `vending-db` provides the SQLite implementation.
//!
//! ## Transaction Scope
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  let mut tx = store.begin().await?;      ← scoped value                 │
//! │                                                                         │
//! │  let product = tx.product(id).await?;    ← reads see one snapshot       │
//! │  let account = tx.account(id).await?;                                  │
//! │                                                                         │
//! │  tx.save_product(&p).await?;             ← compare-and-swap on version  │
//! │  tx.save_account(&a).await?;                                           │
//! │                                                                         │
//! │  tx.commit().await?;                     ← all or nothing               │
//! │                                                                         │
//! │  Dropped without commit (error, timeout, cancelled future)             │
//! │    → rolled back, nothing persisted                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `save_*` succeed only when the row still carries the version that was
//! read. A miss is reported as [`StoreError::Conflict`] and the whole
//! transaction should be retried from the start.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Account, NewProduct, Product, Role};

// =============================================================================
// Store Error
// =============================================================================

/// Outcomes a store implementation can report.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A uniqueness, check or foreign key constraint rejected the write.
    #[error("constraint violation on {field}: {detail}")]
    ConstraintViolation { field: String, detail: String },

    /// Optimistic concurrency lost a race. Retryable.
    #[error("concurrent modification detected")]
    Conflict,

    /// The backend did not answer in time.
    #[error("store operation timed out")]
    Timeout,

    /// Anything else the backend reports.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Shorthand used by adapters.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// True for errors worth retrying the transaction on.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict)
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Records
// =============================================================================

/// Account row to insert. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

/// The only shape in which a password hash leaves the store.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StoredCredentials {
    pub account_id: String,
    pub username: String,
    pub password_hash: String,
}

// =============================================================================
// Traits
// =============================================================================

/// Persistent storage for accounts and products.
///
/// Single-row operations run in their own implicit transaction. Anything
/// that reads and then writes goes through [`Store::begin`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a transaction.
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;

    async fn get_account(&self, id: &str) -> StoreResult<Account>;

    async fn find_account_by_username(&self, username: &str) -> StoreResult<Option<Account>>;

    async fn find_credentials(&self, username: &str) -> StoreResult<Option<StoredCredentials>>;

    /// Inserts with balance 0 and version 0. Duplicate usernames are a
    /// `ConstraintViolation`.
    async fn create_account(&self, account: NewAccount) -> StoreResult<Account>;

    /// Fails with `ConstraintViolation` while the account still owns products.
    async fn delete_account(&self, id: &str) -> StoreResult<()>;

    async fn update_password(&self, id: &str, password_hash: &str) -> StoreResult<()>;

    async fn get_product(&self, id: &str) -> StoreResult<Product>;

    async fn list_products(&self) -> StoreResult<Vec<Product>>;

    async fn create_product(&self, seller_id: &str, product: NewProduct) -> StoreResult<Product>;

    async fn delete_product(&self, id: &str) -> StoreResult<()>;
}

/// An open store transaction.
///
/// Reads take the row as it is inside the transaction; saves compare the
/// version they were given and bump it.
#[async_trait]
pub trait StoreTx: Send {
    async fn account(&mut self, id: &str) -> StoreResult<Account>;

    async fn product(&mut self, id: &str) -> StoreResult<Product>;

    /// Writes balance. Returns the row with the bumped version.
    async fn save_account(&mut self, account: &Account) -> StoreResult<Account>;

    /// Writes name, price and stock. Returns the row with the bumped version.
    async fn save_product(&mut self, product: &Product) -> StoreResult<Product>;

    /// Makes every write of this transaction durable.
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
