//! # Account Ledger
//!
//! Balance changes: deposit, reset, debit. Each one is a read-modify-write
//! inside a store transaction, retried on conflict, so concurrent deposits to
//! one account never lose an update.
//!
//! ## Deposit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  deposit(account_id, 50)                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Denomination::try_from(50) ── not 5/10/20/50/100 ──► InvalidInput     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  run_tx:  begin → tx.account(id) → account.deposit(coin)                │
//! │           → tx.save_account (version CAS) → commit                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Account { balance: +50, version: +1 }                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use vending_core::{Account, Coins, CoreResult, Denomination, Store};

use crate::error::{EngineError, EngineResult};
use crate::tx::{run_tx, TxPolicy};

/// Balance operations on accounts.
pub struct Ledger {
    store: Arc<dyn Store>,
    policy: TxPolicy,
}

impl Ledger {
    pub fn new(store: Arc<dyn Store>, policy: TxPolicy) -> Self {
        Ledger { store, policy }
    }

    /// Adds one accepted coin to the balance.
    pub async fn deposit(&self, account_id: &str, amount: i64) -> EngineResult<Account> {
        let coin = Denomination::try_from(amount)?;

        let account = self
            .update_balance("deposit", account_id, |account| account.deposit(coin))
            .await?;

        tracing::info!(
            account_id = %account_id,
            amount,
            balance = %account.balance,
            "Deposit accepted"
        );
        Ok(account)
    }

    /// Sets the balance to zero. A zero balance is returned untouched, with
    /// no write and no version bump.
    pub async fn reset(&self, account_id: &str) -> EngineResult<Account> {
        let store: &dyn Store = self.store.as_ref();

        let account = run_tx(self.policy, "reset", move || async move {
            let mut tx = store.begin().await?;
            let mut account = tx.account(account_id).await?;
            if account.balance.is_zero() {
                return Ok::<_, EngineError>(account);
            }

            account.reset();
            let saved = tx.save_account(&account).await?;
            tx.commit().await?;
            Ok(saved)
        })
        .await?;

        tracing::info!(account_id = %account_id, version = account.version, "Balance reset");
        Ok(account)
    }

    /// Takes `amount` off the balance. `InsufficientFunds` when it would go
    /// negative.
    pub async fn debit(&self, account_id: &str, amount: Coins) -> EngineResult<Account> {
        let account = self
            .update_balance("debit", account_id, |account| account.debit(amount))
            .await?;

        tracing::info!(
            account_id = %account_id,
            amount = %amount,
            balance = %account.balance,
            "Balance debited"
        );
        Ok(account)
    }

    async fn update_balance<F>(
        &self,
        operation: &'static str,
        account_id: &str,
        mutate: F,
    ) -> EngineResult<Account>
    where
        F: Fn(&mut Account) -> CoreResult<()> + Send + Sync,
    {
        let store: &dyn Store = self.store.as_ref();
        let mutate = &mutate;

        run_tx(self.policy, operation, move || async move {
            let mut tx = store.begin().await?;
            let mut account = tx.account(account_id).await?;
            mutate(&mut account)?;
            let saved = tx.save_account(&account).await?;
            tx.commit().await?;
            Ok::<_, EngineError>(saved)
        })
        .await
    }
}
