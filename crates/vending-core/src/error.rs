//! # Error Types
//!
//! Domain-specific error types for vending-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  vending-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  vending-core store errors (store.rs)                                  │
//! │  └── StoreError       - Persistence outcomes (NotFound, Conflict, ...) │
//! │                                                                         │
//! │  vending-db errors (separate crate)                                    │
//! │  └── DbError          - SQLite failures, folded into StoreError        │
//! │                                                                         │
//! │  vending-engine errors                                                 │
//! │  └── EngineError      - What the caller sees (kind + message)          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → ErrorResponse       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::coins::{Coins, Denomination};

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Deposit amount is not one of the accepted coins.
    #[error("[{amount}] is not an accepted denomination: use one of {}", accepted_denominations())]
    InvalidDenomination { amount: i64 },

    /// Balance does not cover the requested debit.
    ///
    /// ## User Workflow
    /// ```text
    /// Balance: 20, Buy 1 × 25
    ///      │
    ///      ▼
    /// InsufficientFunds { required: 25, available: 20 }
    /// ```
    #[error("insufficient funds to spend [{required}], available balance is [{available}]")]
    InsufficientFunds { required: Coins, available: Coins },

    /// Not enough units in stock to fill the request.
    #[error("requested amount {requested} of {product} is greater than available amount {available}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Arithmetic would overflow the coin range.
    #[error("{operation} overflows the supported coin range")]
    AmountOverflow { operation: &'static str },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

fn accepted_denominations() -> String {
    Denomination::accepted_values()
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Two fields that must agree do not.
    #[error("{field} and {other} do not match")]
    Mismatch { field: String, other: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
