//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Listing and lookup
//! - Insert for a seller
//! - Versioned update (name, price, stock) used inside store transactions
//! - Hard delete
//!
//! ## Stock Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Purchases write the absolute stock they computed, guarded by the   │
//! │  version they read:                                                 │
//! │                                                                     │
//! │     UPDATE products SET stock = 0, version = version + 1            │
//! │     WHERE id = ? AND version = 7                                    │
//! │                                                                     │
//! │  Two buyers racing for the last unit: one matches version 7, the    │
//! │  other matches nothing, retries, re-reads stock 0 and gets          │
//! │  InsufficientStock. The CHECK (stock >= 0) column constraint is a   │
//! │  second line that never fires in normal operation.                  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use vending_core::{NewProduct, Product};

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let all = repo.list().await?;
/// let product = repo.get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists every product, sorted by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price, stock, seller_id, version, created_at, updated_at
            FROM products
            ORDER BY name, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_by_id(&mut conn, id).await
    }

    /// Inserts a new product owned by `seller_id`.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The stored row
    /// * `Err(DbError::ForeignKeyViolation)` - Seller does not exist
    pub async fn insert(&self, seller_id: &str, product: &NewProduct) -> DbResult<Product> {
        let now = Utc::now();
        let created = Product {
            id: generate_product_id(),
            name: product.name.trim().to_string(),
            price: product.price,
            stock: product.stock,
            seller_id: seller_id.to_string(),
            version: 0,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %created.id, seller_id = %seller_id, name = %created.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, price, stock, seller_id, version, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&created.id)
        .bind(&created.name)
        .bind(created.price)
        .bind(created.stock)
        .bind(&created.seller_id)
        .bind(created.version)
        .bind(created.created_at)
        .bind(created.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(created)
    }

    /// Deletes a product regardless of its remaining stock.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("product", id));
        }

        Ok(())
    }

    /// Counts total products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Connection-level queries (shared with store transactions)
// =============================================================================

pub(crate) async fn fetch_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    debug!(id = %id, "Fetching product");

    let product = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, price, stock, seller_id, version, created_at, updated_at
        FROM products
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(product)
}

/// Writes name, price and stock if the row is still at `product.version`.
pub(crate) async fn save(conn: &mut SqliteConnection, product: &Product) -> DbResult<Product> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE products
        SET name = ?2, price = ?3, stock = ?4, updated_at = ?5, version = version + 1
        WHERE id = ?1 AND version = ?6
        "#,
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(product.price)
    .bind(product.stock)
    .bind(now)
    .bind(product.version)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        debug!(id = %product.id, version = product.version, "Product version check failed");
        return Err(DbError::conflict("product", &product.id));
    }

    Ok(Product {
        version: product.version + 1,
        updated_at: now,
        ..product.clone()
    })
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use vending_core::{Coins, NewAccount, Role};

    async fn seeded() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let seller = db
            .accounts()
            .insert(&NewAccount {
                username: "seller".to_string(),
                password_hash: "hash".to_string(),
                role: Role::Seller,
            })
            .await
            .unwrap();
        (db, seller.id)
    }

    fn cola() -> NewProduct {
        NewProduct {
            name: "Cola".to_string(),
            price: Coins::new(25),
            stock: 3,
        }
    }

    #[tokio::test]
    async fn test_insert_get_list() {
        let (db, seller_id) = seeded().await;
        let repo = db.products();

        let created = repo.insert(&seller_id, &cola()).await.unwrap();
        repo.insert(
            &seller_id,
            &NewProduct {
                name: "Apple Juice".to_string(),
                price: Coins::new(40),
                stock: 0,
            },
        )
        .await
        .unwrap();

        let fetched = repo.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.price, Coins::new(25));
        assert_eq!(fetched.stock, 3);
        assert_eq!(fetched.seller_id, seller_id);

        let names: Vec<_> = repo.list().await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Apple Juice", "Cola"]);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unknown_seller_rejected() {
        let (db, _) = seeded().await;
        let err = db.products().insert("missing-seller", &cola()).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_seller_with_products_cannot_be_deleted() {
        let (db, seller_id) = seeded().await;
        let product = db.products().insert(&seller_id, &cola()).await.unwrap();

        let err = db.accounts().delete(&seller_id).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));

        db.products().delete(&product.id).await.unwrap();
        db.accounts().delete(&seller_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_checks_version() {
        let (db, seller_id) = seeded().await;
        let mut product = db.products().insert(&seller_id, &cola()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        product.stock = 0;
        let saved = save(&mut conn, &product).await.unwrap();
        assert_eq!(saved.version, 1);
        assert_eq!(saved.stock, 0);

        product.stock = 2;
        assert!(matches!(
            save(&mut conn, &product).await,
            Err(DbError::Conflict { .. })
        ));
    }
}
