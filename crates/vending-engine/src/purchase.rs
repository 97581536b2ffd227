//! # Purchase Orchestrator
//!
//! Runs a buy as one store transaction: the stock decrement and the balance
//! reset commit together or not at all.
//!
//! ## Buy Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  buy(buyer_id, product_id, quantity)                                    │
//! │                                                                         │
//! │  quantity <= 0 ───────────────────────────────► InvalidInput           │
//! │                                                                         │
//! │  ┌─── transaction (retried on conflict) ──────────────────────────┐    │
//! │  │ 1. tx.product(product_id)          missing ─► NotFound         │    │
//! │  │ 2. check_stock                     short ───► InsufficientStock│    │
//! │  │ 3. tx.account(buyer_id)            missing ─► NotFound         │    │
//! │  │ 4-5. plan_purchase                 cost > balance ─► Funds     │    │
//! │  │ 6. tx.save_product  (stock -= quantity)                        │    │
//! │  │ 7. tx.save_account  (balance = 0)                              │    │
//! │  │    commit                                                      │    │
//! │  └────────────────────────────────────────────────────────────────┘    │
//! │                                                                         │
//! │  8-9. PurchaseResult { amount_spent, product_name, quantity, change }  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any failure before commit drops the transaction, so nothing is written.

use std::sync::Arc;

use vending_core::validation::validate_quantity;
use vending_core::{check_stock, plan_purchase, PurchaseResult, Store};

use crate::error::{EngineError, EngineResult};
use crate::tx::{run_tx, TxPolicy};

/// Executes purchases.
pub struct Purchases {
    store: Arc<dyn Store>,
    policy: TxPolicy,
}

impl Purchases {
    pub fn new(store: Arc<dyn Store>, policy: TxPolicy) -> Self {
        Purchases { store, policy }
    }

    /// Buys `quantity` units of `product_id` with `buyer_id`'s whole balance
    /// and returns the spent amount plus change.
    pub async fn buy(
        &self,
        buyer_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> EngineResult<PurchaseResult> {
        validate_quantity(quantity)?;

        let store: &dyn Store = self.store.as_ref();

        let result = run_tx(self.policy, "purchase", move || async move {
            let mut tx = store.begin().await?;

            let product = tx.product(product_id).await?;
            check_stock(&product, quantity)?;

            let buyer = tx.account(buyer_id).await?;
            let plan = plan_purchase(&buyer, &product, quantity)?;

            tx.save_product(&plan.product).await?;
            tx.save_account(&plan.account).await?;
            tx.commit().await?;

            Ok::<_, EngineError>(plan.result)
        })
        .await?;

        tracing::info!(
            buyer_id = %buyer_id,
            product_id = %product_id,
            quantity,
            amount_spent = %result.amount_spent,
            change = %result.change.dispensed(),
            "Purchase completed"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ledger::Ledger;
    use std::time::Duration;
    use vending_core::{Account, Coins, Denomination, NewAccount, NewProduct, Product, Role};
    use vending_db::{Database, DbConfig};

    struct Fixture {
        store: Arc<dyn Store>,
        purchases: Purchases,
        ledger: Ledger,
        buyer: Account,
        product: Product,
    }

    async fn setup(price: i64, stock: i64) -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store: Arc<dyn Store> = Arc::new(db.store());

        let seller = store
            .create_account(NewAccount {
                username: "seller".to_string(),
                password_hash: "hash".to_string(),
                role: Role::Seller,
            })
            .await
            .unwrap();
        let buyer = store
            .create_account(NewAccount {
                username: "buyer".to_string(),
                password_hash: "hash".to_string(),
                role: Role::Buyer,
            })
            .await
            .unwrap();
        let product = store
            .create_product(
                &seller.id,
                NewProduct {
                    name: "Cola".to_string(),
                    price: Coins::new(price),
                    stock,
                },
            )
            .await
            .unwrap();

        let policy = TxPolicy::new(Duration::from_secs(2), 3);
        Fixture {
            purchases: Purchases::new(store.clone(), policy),
            ledger: Ledger::new(store.clone(), policy),
            store,
            buyer,
            product,
        }
    }

    #[tokio::test]
    async fn test_buy_spends_and_returns_change() {
        let f = setup(25, 3).await;
        f.ledger.deposit(&f.buyer.id, 50).await.unwrap();
        f.ledger.deposit(&f.buyer.id, 50).await.unwrap();

        let result = f.purchases.buy(&f.buyer.id, &f.product.id, 3).await.unwrap();

        assert_eq!(result.amount_spent, Coins::new(75));
        assert_eq!(result.product_name, "Cola");
        assert_eq!(result.quantity_purchased, 3);
        assert_eq!(result.change.count(Denomination::Twenty), 1);
        assert_eq!(result.change.count(Denomination::Five), 1);
        assert_eq!(result.change.coin_count(), 2);

        assert_eq!(f.store.get_product(&f.product.id).await.unwrap().stock, 0);
        assert!(f.store.get_account(&f.buyer.id).await.unwrap().balance.is_zero());
    }

    #[tokio::test]
    async fn test_short_stock_writes_nothing() {
        let f = setup(25, 2).await;
        f.ledger.deposit(&f.buyer.id, 100).await.unwrap();

        let err = f.purchases.buy(&f.buyer.id, &f.product.id, 3).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        assert_eq!(f.store.get_product(&f.product.id).await.unwrap().stock, 2);
        assert_eq!(
            f.store.get_account(&f.buyer.id).await.unwrap().balance,
            Coins::new(100)
        );
    }

    #[tokio::test]
    async fn test_short_funds_writes_nothing() {
        let f = setup(25, 5).await;
        f.ledger.deposit(&f.buyer.id, 50).await.unwrap();

        let err = f.purchases.buy(&f.buyer.id, &f.product.id, 3).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);

        let product = f.store.get_product(&f.product.id).await.unwrap();
        assert_eq!(product.stock, 5);
        assert_eq!(product.version, f.product.version);
        assert_eq!(
            f.store.get_account(&f.buyer.id).await.unwrap().balance,
            Coins::new(50)
        );
    }

    #[tokio::test]
    async fn test_exact_payment_returns_no_change() {
        let f = setup(50, 1).await;
        f.ledger.deposit(&f.buyer.id, 50).await.unwrap();

        let result = f.purchases.buy(&f.buyer.id, &f.product.id, 1).await.unwrap();
        assert!(result.change.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_requests() {
        let f = setup(25, 3).await;

        let err = f.purchases.buy(&f.buyer.id, &f.product.id, 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = f.purchases.buy(&f.buyer.id, "missing", 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = f.purchases.buy("missing", &f.product.id, 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_cost_overflow_is_invalid_input() {
        let f = setup(i64::MAX / 2, 3).await;
        f.ledger.deposit(&f.buyer.id, 100).await.unwrap();

        let err = f.purchases.buy(&f.buyer.id, &f.product.id, 3).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
