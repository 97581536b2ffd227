//! # Account Repository
//!
//! Database operations for accounts.
//!
//! ## Key Operations
//! - Lookup by id and by username
//! - Credential lookup for login (the only query that reads `password_hash`)
//! - Insert, password change, delete
//! - Versioned balance write used inside store transactions
//!
//! ## Versioned Write
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Tx A reads balance 0 (version 3)    Tx B reads balance 0 (version 3)  │
//! │  Tx A: UPDATE ... SET balance = 10,  version = 4                       │
//! │        WHERE id = ? AND version = 3   → 1 row ✓                        │
//! │  Tx B: UPDATE ... SET balance = 20,  version = 4                       │
//! │        WHERE id = ? AND version = 3   → 0 rows → Conflict → retry      │
//! │  Tx B (retry) reads balance 10 (version 4) → writes 30                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use vending_core::{Account, Coins, NewAccount, StoredCredentials};

/// Repository for account database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.accounts();
/// let account = repo.get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    /// Creates a new AccountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AccountRepository { pool }
    }

    /// Gets an account by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Account>> {
        let mut conn = self.pool.acquire().await?;
        fetch_by_id(&mut conn, id).await
    }

    /// Gets an account by its username.
    pub async fn find_by_username(&self, username: &str) -> DbResult<Option<Account>> {
        debug!(username = %username, "Looking up account by username");

        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, username, balance, role, version, created_at, updated_at
            FROM accounts
            WHERE username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Reads the stored password hash for a username.
    pub async fn find_credentials(&self, username: &str) -> DbResult<Option<StoredCredentials>> {
        let credentials = sqlx::query_as::<_, StoredCredentials>(
            r#"
            SELECT id AS account_id, username, password_hash
            FROM accounts
            WHERE username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(credentials)
    }

    /// Inserts a new account with a zero balance.
    ///
    /// ## Returns
    /// * `Ok(Account)` - The stored row
    /// * `Err(DbError::UniqueViolation)` - Username already taken
    pub async fn insert(&self, account: &NewAccount) -> DbResult<Account> {
        let now = Utc::now();
        let created = Account {
            id: generate_account_id(),
            username: account.username.trim().to_string(),
            balance: Coins::zero(),
            role: account.role,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %created.id, username = %created.username, role = %created.role, "Inserting account");

        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, username, password_hash, balance, role, version, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&created.id)
        .bind(&created.username)
        .bind(&account.password_hash)
        .bind(created.balance)
        .bind(created.role)
        .bind(created.version)
        .bind(created.created_at)
        .bind(created.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("username", &created.username),
            other => other,
        })?;

        Ok(created)
    }

    /// Replaces the password hash. Bumps the version so an in-flight
    /// transaction holding the old row retries.
    pub async fn update_password(&self, id: &str, password_hash: &str) -> DbResult<()> {
        debug!(id = %id, "Updating password");

        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET password_hash = ?2, updated_at = ?3, version = version + 1
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("account", id));
        }

        Ok(())
    }

    /// Deletes an account.
    ///
    /// Sellers that still own products hit the `ON DELETE RESTRICT` foreign
    /// key and get `ForeignKeyViolation`.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting account");

        let result = sqlx::query("DELETE FROM accounts WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("account", id));
        }

        Ok(())
    }

    /// Counts accounts (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Connection-level queries (shared with store transactions)
// =============================================================================

pub(crate) async fn fetch_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Account>> {
    debug!(id = %id, "Fetching account");

    let account = sqlx::query_as::<_, Account>(
        r#"
        SELECT id, username, balance, role, version, created_at, updated_at
        FROM accounts
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(account)
}

/// Writes `account.balance` if the row is still at `account.version`.
///
/// ## Returns
/// * `Ok(Account)` - Row as written (version + 1)
/// * `Err(DbError::Conflict)` - Row moved on or was deleted
pub(crate) async fn save_balance(conn: &mut SqliteConnection, account: &Account) -> DbResult<Account> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE accounts
        SET balance = ?2, updated_at = ?3, version = version + 1
        WHERE id = ?1 AND version = ?4
        "#,
    )
    .bind(&account.id)
    .bind(account.balance)
    .bind(now)
    .bind(account.version)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        debug!(id = %account.id, version = account.version, "Account version check failed");
        return Err(DbError::conflict("account", &account.id));
    }

    Ok(Account {
        version: account.version + 1,
        updated_at: now,
        ..account.clone()
    })
}

/// Helper to generate a new account ID.
pub fn generate_account_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
