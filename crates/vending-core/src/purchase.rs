//! # Purchase Planning
//!
//! Computes the outcome of a purchase without touching storage. The engine
//! loads the rows, asks for a [`PurchasePlan`], and writes the planned rows
//! back inside one transaction.
//!
//! ## Order of Checks
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  quantity > 0 ?                    no  → Validation (InvalidInput)     │
//! │  quantity <= product.stock ?       no  → InsufficientStock             │
//! │  cost = quantity × price           overflow → AmountOverflow           │
//! │  cost <= buyer.balance ?           no  → InsufficientFunds             │
//! │                                                                         │
//! │  plan:                                                                  │
//! │    product.stock  -= quantity                                          │
//! │    buyer.balance   = 0                                                 │
//! │    change          = make_change(balance_before - cost)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The whole remaining balance is returned as change; the account keeps
//! nothing after a purchase.

use serde::{Deserialize, Serialize};

use crate::coins::{make_change, Change, Coins};
use crate::error::{CoreError, CoreResult};
use crate::types::{Account, Product};
use crate::validation::validate_quantity;

/// What the buyer gets back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseResult {
    pub amount_spent: Coins,
    pub product_name: String,
    pub quantity_purchased: i64,
    pub change: Change,
}

/// Rows to persist plus the result to hand back.
#[derive(Debug, Clone)]
pub struct PurchasePlan {
    pub account: Account,
    pub product: Product,
    pub result: PurchaseResult,
}

/// Fails with `InsufficientStock` when `quantity` exceeds the product's stock.
///
/// Split out so the engine can reject before it loads the buyer.
pub fn check_stock(product: &Product, quantity: i64) -> CoreResult<()> {
    validate_quantity(quantity)?;

    if quantity > product.stock {
        return Err(CoreError::InsufficientStock {
            product: product.name.clone(),
            available: product.stock,
            requested: quantity,
        });
    }

    Ok(())
}

/// Plans a purchase of `quantity` units of `product` by `buyer`.
///
/// Inputs are taken by reference and left untouched; on error nothing is
/// planned.
///
/// ## Example
/// ```rust
/// # use chrono::Utc;
/// # use vending_core::{plan_purchase, Account, Coins, Denomination, Product, Role};
/// # let now = Utc::now();
/// # let buyer = Account { id: "b".into(), username: "bob".into(), balance: Coins::new(100),
/// #     role: Role::Buyer, version: 0, created_at: now, updated_at: now };
/// # let product = Product { id: "p".into(), name: "Cola".into(), price: Coins::new(25),
/// #     stock: 3, seller_id: "s".into(), version: 0, created_at: now, updated_at: now };
/// let plan = plan_purchase(&buyer, &product, 3).unwrap();
/// assert_eq!(plan.result.amount_spent, Coins::new(75));
/// assert_eq!(plan.product.stock, 0);
/// assert!(plan.account.balance.is_zero());
/// assert_eq!(plan.result.change.count(Denomination::Twenty), 1);
/// assert_eq!(plan.result.change.count(Denomination::Five), 1);
/// ```
pub fn plan_purchase(buyer: &Account, product: &Product, quantity: i64) -> CoreResult<PurchasePlan> {
    check_stock(product, quantity)?;

    let cost = product
        .price
        .checked_mul_quantity(quantity)
        .ok_or(CoreError::AmountOverflow {
            operation: "purchase cost",
        })?;

    let mut account = buyer.clone();
    account.debit(cost)?;
    let change = make_change(account.balance);
    account.reset();

    let mut product_after = product.clone();
    product_after.decrement_stock(quantity)?;

    Ok(PurchasePlan {
        account,
        result: PurchaseResult {
            amount_spent: cost,
            product_name: product.name.clone(),
            quantity_purchased: quantity,
            change,
        },
        product: product_after,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
