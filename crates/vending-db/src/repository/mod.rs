//! # Repository Module
//!
//! Database repository implementations for the vending backend.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Pool-level methods (one statement, implicit transaction):             │
//! │                                                                         │
//! │    db.accounts().insert(&new_account)                                  │
//! │    db.products().list()                                                │
//! │                                                                         │
//! │  Connection-level functions (run inside a store transaction):          │
//! │                                                                         │
//! │    account::fetch_by_id(&mut tx, id)                                   │
//! │    account::save_balance(&mut tx, &account)   ← version-checked        │
//! │    product::save(&mut tx, &product)           ← version-checked        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`AccountRepository`](account::AccountRepository) - Accounts and credentials
//! - [`ProductRepository`](product::ProductRepository) - Product catalog

pub mod account;
pub mod product;
