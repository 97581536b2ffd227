//! # Account Service
//!
//! Registration, credential checks, password changes and account removal.
//! Ownership of the target account is checked by the caller
//! (`VendingService`); this module only enforces the account rules.
//!
//! Password hashing runs on the blocking pool so a burst of logins does not
//! stall the async workers.

use std::sync::Arc;

use vending_core::validation::{validate_password, validate_username};
use vending_core::{Account, NewAccount, Role, Store, ValidationError};

use crate::error::{EngineError, EngineResult};
use crate::password::PasswordHasher;
use crate::tx::{bounded, TxPolicy};

/// Account lifecycle and credentials.
pub struct AccountService {
    store: Arc<dyn Store>,
    policy: TxPolicy,
    passwords: PasswordHasher,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, policy: TxPolicy, passwords: PasswordHasher) -> Self {
        AccountService {
            store,
            policy,
            passwords,
        }
    }

    /// Creates an account with a zero balance.
    ///
    /// ## Rules
    /// - username: 3 to 50 letters, digits, `.`, `-` or `_`; must be unused
    /// - password: non-empty, at most 128 characters
    /// - role: `buyer` or `seller`; blank means `buyer`
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        role: Option<&str>,
    ) -> EngineResult<Account> {
        validate_username(username)?;
        validate_password("password", password)?;

        let role = match role.map(str::trim) {
            None | Some("") => Role::default(),
            Some(raw) => raw.parse::<Role>()?,
        };

        let password_hash = self.hash(password).await?;

        let account = bounded(
            self.policy.timeout,
            "register",
            self.store.create_account(NewAccount {
                username: username.trim().to_string(),
                password_hash,
                role,
            }),
        )
        .await?;

        tracing::info!(
            account_id = %account.id,
            username = %account.username,
            role = %account.role,
            "Account registered"
        );
        Ok(account)
    }

    /// Returns the account when `password` matches. Unknown usernames and
    /// wrong passwords fail identically.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> EngineResult<Account> {
        let credentials = bounded(
            self.policy.timeout,
            "login",
            self.store.find_credentials(username.trim()),
        )
        .await?;

        let Some(credentials) = credentials else {
            tracing::warn!(username = %username, "Login failed: unknown user");
            return Err(EngineError::InvalidCredentials);
        };

        if !self.verify(password, &credentials.password_hash).await? {
            tracing::warn!(username = %username, "Login failed: wrong password");
            return Err(EngineError::InvalidCredentials);
        }

        self.get(&credentials.account_id).await
    }

    pub async fn get(&self, account_id: &str) -> EngineResult<Account> {
        tracing::debug!(account_id = %account_id, "Fetching account");
        bounded(self.policy.timeout, "get account", self.store.get_account(account_id)).await
    }

    /// Fails with `ConstraintViolation` while the account still owns products.
    pub async fn delete(&self, account_id: &str) -> EngineResult<()> {
        bounded(
            self.policy.timeout,
            "delete account",
            self.store.delete_account(account_id),
        )
        .await?;

        tracing::info!(account_id = %account_id, "Account deleted");
        Ok(())
    }

    /// Replaces the password after checking the old one.
    ///
    /// ## Order of Checks
    /// 1. account exists
    /// 2. `old_password` verifies
    /// 3. `new_password` is acceptable
    /// 4. `new_password == confirm_password`
    pub async fn change_password(
        &self,
        account_id: &str,
        old_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> EngineResult<Account> {
        let account = self.get(account_id).await?;

        let credentials = bounded(
            self.policy.timeout,
            "change password",
            self.store.find_credentials(&account.username),
        )
        .await?
        .ok_or_else(|| EngineError::NotFound {
            entity: "account",
            id: account_id.to_string(),
        })?;

        if !self.verify(old_password, &credentials.password_hash).await? {
            tracing::warn!(account_id = %account_id, "Password change refused: old password does not match");
            return Err(EngineError::InvalidInput(
                "old password does not match".to_string(),
            ));
        }

        validate_password("new password", new_password)?;
        if new_password != confirm_password {
            return Err(ValidationError::Mismatch {
                field: "new password".to_string(),
                other: "confirm password".to_string(),
            }
            .into());
        }

        let password_hash = self.hash(new_password).await?;
        bounded(
            self.policy.timeout,
            "change password",
            self.store.update_password(account_id, &password_hash),
        )
        .await?;

        tracing::info!(account_id = %account_id, "Password changed");
        self.get(account_id).await
    }

    async fn hash(&self, password: &str) -> EngineResult<String> {
        let passwords = self.passwords.clone();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || passwords.hash(&password))
            .await
            .map_err(|e| EngineError::Internal(format!("Password hashing task failed: {e}")))?
    }

    async fn verify(&self, password: &str, hash: &str) -> EngineResult<bool> {
        let passwords = self.passwords.clone();
        let password = password.to_string();
        let hash = hash.to_string();

        tokio::task::spawn_blocking(move || passwords.verify(&password, &hash))
            .await
            .map_err(|e| EngineError::Internal(format!("Password verification task failed: {e}")))
    }
}
