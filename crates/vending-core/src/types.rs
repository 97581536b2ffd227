//! # Domain Types
//!
//! Core domain types used throughout the vending backend.
//!
//! The state-changing rules (deposit, debit, reset, stock decrement) live
//! here as methods so they stay pure; the engine only loads, calls, and
//! persists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::coins::{Coins, Denomination};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::validation::{validate_price, validate_product_name, validate_stock};

// =============================================================================
// Role
// =============================================================================

/// What an account is allowed to do.
///
/// ## Permissions
/// ```text
/// ┌──────────┬──────────────────────────────────────────┐
/// │ buyer    │ deposit, buy, reset (own account only)   │
/// │ seller   │ create/update/delete own products        │
/// └──────────┴──────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Buyer,
    Seller,
}

impl Role {
    /// Lowercase name as stored and displayed.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "buyer" => Ok(Role::Buyer),
            "seller" => Ok(Role::Seller),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: vec!["buyer".to_string(), "seller".to_string()],
            }),
        }
    }
}

// =============================================================================
// Account
// =============================================================================

/// A registered buyer or seller.
///
/// The password hash is never part of this type; it only travels through
/// `store::StoredCredentials` during login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Account {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Login name, unique and immutable.
    pub username: String,

    /// Running coin balance. Never negative.
    pub balance: Coins,

    pub role: Role,

    /// Optimistic concurrency counter, bumped on every write.
    pub version: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Adds one coin to the balance.
    ///
    /// ## User Workflow
    /// ```text
    /// Buyer inserts 50
    ///      │
    ///      ▼
    /// Denomination::try_from(50) ── not a coin? → InvalidDenomination
    ///      │
    ///      ▼
    /// deposit(Fifty) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// balance += 50
    /// ```
    pub fn deposit(&mut self, coin: Denomination) -> CoreResult<()> {
        self.balance = self
            .balance
            .checked_add(coin.coins())
            .ok_or(CoreError::AmountOverflow {
                operation: "deposit",
            })?;
        Ok(())
    }

    /// Removes `amount` from the balance, refusing to go below zero.
    ///
    /// A negative `amount` is rejected rather than credited.
    pub fn debit(&mut self, amount: Coins) -> CoreResult<()> {
        if amount.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "amount".to_string(),
            }
            .into());
        }

        let remaining = self
            .balance
            .checked_sub(amount)
            .ok_or(CoreError::AmountOverflow { operation: "debit" })?;

        if remaining.is_negative() {
            return Err(CoreError::InsufficientFunds {
                required: amount,
                available: self.balance,
            });
        }

        self.balance = remaining;
        Ok(())
    }

    /// Sets the balance to zero. Idempotent.
    pub fn reset(&mut self) {
        self.balance = Coins::zero();
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product stocked in the machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Unit price. Always positive.
    pub price: Coins,

    /// Units available. Never negative.
    pub stock: i64,

    /// Account id of the seller who owns this product.
    pub seller_id: String,

    /// Optimistic concurrency counter, bumped on every write.
    pub version: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Removes `quantity` units from stock.
    ///
    /// Fails with `InsufficientStock` if `quantity > stock`; on success the
    /// new stock is `stock - quantity`, which is never negative.
    pub fn decrement_stock(&mut self, quantity: i64) -> CoreResult<()> {
        if quantity > self.stock {
            return Err(CoreError::InsufficientStock {
                product: self.name.clone(),
                available: self.stock,
                requested: quantity,
            });
        }

        self.stock -= quantity;
        Ok(())
    }

    /// Replaces name, price and stock with already-validated values.
    pub fn apply(&mut self, update: &ProductUpdate) {
        self.name = update.name.trim().to_string();
        self.price = update.price;
        self.stock = update.stock;
    }
}

/// Fields required to list a new product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Coins,
    pub stock: i64,
}

impl NewProduct {
    /// Checks name, price (> 0) and stock (>= 0).
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_product_name(&self.name)?;
        validate_price(self.price)?;
        validate_stock(self.stock)?;
        Ok(())
    }
}

/// Full replacement of a product's mutable fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: String,
    pub price: Coins,
    pub stock: i64,
}

impl ProductUpdate {
    /// Same rules as creation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_product_name(&self.name)?;
        validate_price(self.price)?;
        validate_stock(self.stock)?;
        Ok(())
    }
}

// =============================================================================
// Identity
// =============================================================================

/// The authenticated principal behind a request.
///
/// All ownership comparisons use `account_id`; `username` is carried for
/// logging and for matching against the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub account_id: String,
    pub username: String,
    pub role: Role,
}

impl From<&Account> for Identity {
    fn from(account: &Account) -> Self {
        Identity {
            account_id: account.id.clone(),
            username: account.username.clone(),
            role: account.role,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
