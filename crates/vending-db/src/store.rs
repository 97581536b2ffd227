//! # SQLite Store Adapter
//!
//! Implements the `vending_core::Store` / `StoreTx` traits on top of the
//! repositories.
//!
//! ## Transaction Lifetime
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  store.begin()  → pool.begin() → SqliteTx { Transaction<'static> }     │
//! │       │                                                                 │
//! │       │  holds one pooled connection for its whole life                │
//! │       ▼                                                                 │
//! │  tx.account / tx.product      SELECT on that connection                │
//! │  tx.save_account / save_product   UPDATE ... AND version = ?            │
//! │       │                                                                 │
//! │       ├── commit()  → COMMIT, connection back to pool                  │
//! │       └── dropped   → ROLLBACK queued, connection back to pool         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use sqlx::{Sqlite, Transaction};
use tracing::{debug, warn};

use crate::error::DbError;
use crate::pool::Database;
use crate::repository::{account, product};
use vending_core::{
    Account, NewAccount, NewProduct, Product, Store, StoreError, StoreResult, StoreTx,
    StoredCredentials,
};

/// `Store` backed by the SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        SqliteStore { db }
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self.db.pool().begin().await.map_err(DbError::from)?;
        Ok(Box::new(SqliteTx { tx }))
    }

    async fn get_account(&self, id: &str) -> StoreResult<Account> {
        self.db
            .accounts()
            .get_by_id(id)
            .await?
            .ok_or_else(|| StoreError::not_found("account", id))
    }

    async fn find_account_by_username(&self, username: &str) -> StoreResult<Option<Account>> {
        Ok(self.db.accounts().find_by_username(username).await?)
    }

    async fn find_credentials(&self, username: &str) -> StoreResult<Option<StoredCredentials>> {
        Ok(self.db.accounts().find_credentials(username).await?)
    }

    async fn create_account(&self, new_account: NewAccount) -> StoreResult<Account> {
        Ok(self.db.accounts().insert(&new_account).await?)
    }

    async fn delete_account(&self, id: &str) -> StoreResult<()> {
        match self.db.accounts().delete(id).await {
            Ok(()) => Ok(()),
            Err(DbError::ForeignKeyViolation { .. }) => {
                warn!(id = %id, "Refusing to delete account that still owns products");
                Err(StoreError::ConstraintViolation {
                    field: "products".to_string(),
                    detail: "account still owns products".to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> StoreResult<()> {
        Ok(self.db.accounts().update_password(id, password_hash).await?)
    }

    async fn get_product(&self, id: &str) -> StoreResult<Product> {
        self.db
            .products()
            .get_by_id(id)
            .await?
            .ok_or_else(|| StoreError::not_found("product", id))
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        Ok(self.db.products().list().await?)
    }

    async fn create_product(&self, seller_id: &str, new_product: NewProduct) -> StoreResult<Product> {
        Ok(self.db.products().insert(seller_id, &new_product).await?)
    }

    async fn delete_product(&self, id: &str) -> StoreResult<()> {
        Ok(self.db.products().delete(id).await?)
    }
}

/// An open SQLite transaction.
pub struct SqliteTx {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl StoreTx for SqliteTx {
    async fn account(&mut self, id: &str) -> StoreResult<Account> {
        account::fetch_by_id(&mut self.tx, id)
            .await?
            .ok_or_else(|| StoreError::not_found("account", id))
    }

    async fn product(&mut self, id: &str) -> StoreResult<Product> {
        product::fetch_by_id(&mut self.tx, id)
            .await?
            .ok_or_else(|| StoreError::not_found("product", id))
    }

    async fn save_account(&mut self, row: &Account) -> StoreResult<Account> {
        Ok(account::save_balance(&mut self.tx, row).await?)
    }

    async fn save_product(&mut self, row: &Product) -> StoreResult<Product> {
        Ok(product::save(&mut self.tx, row).await?)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(DbError::from)?;
        debug!("Transaction committed");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
