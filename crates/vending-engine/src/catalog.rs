//! # Inventory Catalog
//!
//! Products and their stock. Reads are public; every write is made by the
//! seller who owns the product.
//!
//! ## Ownership Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create  : identity.role == seller                 (owner = identity)   │
//! │  update  : identity.role == seller && product.seller_id == identity.id  │
//! │  delete  : identity.role == seller && product.seller_id == identity.id  │
//! │  get/list: anyone                                                        │
//! │                                                                         │
//! │  decrement_stock: internal, n > stock → InsufficientStock               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use vending_core::validation::validate_quantity;
use vending_core::{Action, Identity, NewProduct, Product, ProductUpdate, Store};

use crate::error::{EngineError, EngineResult};
use crate::gate::authorize;
use crate::tx::{bounded, run_tx, TxPolicy};

/// Product reads and owner-checked writes.
pub struct Catalog {
    store: Arc<dyn Store>,
    policy: TxPolicy,
}

impl Catalog {
    pub fn new(store: Arc<dyn Store>, policy: TxPolicy) -> Self {
        Catalog { store, policy }
    }

    pub async fn get(&self, product_id: &str) -> EngineResult<Product> {
        tracing::debug!(product_id = %product_id, "Fetching product");
        bounded(self.policy.timeout, "get product", self.store.get_product(product_id)).await
    }

    /// Every product, ordered by name.
    pub async fn list(&self) -> EngineResult<Vec<Product>> {
        let products =
            bounded(self.policy.timeout, "list products", self.store.list_products()).await?;
        tracing::debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Lists a new product owned by `seller`.
    pub async fn create(&self, seller: &Identity, product: NewProduct) -> EngineResult<Product> {
        authorize(seller, Action::CreateProduct, &seller.account_id)?;
        product.validate()?;

        let product = NewProduct {
            name: product.name.trim().to_string(),
            ..product
        };

        let created = bounded(
            self.policy.timeout,
            "create product",
            self.store.create_product(&seller.account_id, product),
        )
        .await?;

        tracing::info!(
            product_id = %created.id,
            seller_id = %created.seller_id,
            price = %created.price,
            stock = created.stock,
            "Product created"
        );
        Ok(created)
    }

    /// Replaces name, price and stock of a product `seller` owns.
    pub async fn update(
        &self,
        seller: &Identity,
        product_id: &str,
        update: ProductUpdate,
    ) -> EngineResult<Product> {
        update.validate()?;

        let store: &dyn Store = self.store.as_ref();
        let update = &update;

        let product = run_tx(self.policy, "update product", move || async move {
            let mut tx = store.begin().await?;
            let mut product = tx.product(product_id).await?;
            authorize(seller, Action::UpdateProduct, &product.seller_id)?;
            product.apply(update);
            let saved = tx.save_product(&product).await?;
            tx.commit().await?;
            Ok::<_, EngineError>(saved)
        })
        .await?;

        tracing::info!(
            product_id = %product.id,
            price = %product.price,
            stock = product.stock,
            "Product updated"
        );
        Ok(product)
    }

    /// Removes a product `seller` owns, whatever its stock.
    pub async fn delete(&self, seller: &Identity, product_id: &str) -> EngineResult<()> {
        let product = self.get(product_id).await?;
        authorize(seller, Action::DeleteProduct, &product.seller_id)?;

        bounded(
            self.policy.timeout,
            "delete product",
            self.store.delete_product(product_id),
        )
        .await?;

        tracing::info!(product_id = %product_id, stock = product.stock, "Product deleted");
        Ok(())
    }

    /// Takes `quantity` units out of stock.
    pub async fn decrement_stock(&self, product_id: &str, quantity: i64) -> EngineResult<Product> {
        validate_quantity(quantity)?;

        let store: &dyn Store = self.store.as_ref();

        let product = run_tx(self.policy, "decrement stock", move || async move {
            let mut tx = store.begin().await?;
            let mut product = tx.product(product_id).await?;
            product.decrement_stock(quantity)?;
            let saved = tx.save_product(&product).await?;
            tx.commit().await?;
            Ok::<_, EngineError>(saved)
        })
        .await?;

        tracing::info!(product_id = %product_id, quantity, stock = product.stock, "Stock decremented");
        Ok(product)
    }
}
