//! # Vending Service
//!
//! The single entry point callers use. Every guarded operation goes through
//! the same three steps before it touches storage.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  caller(token, account_id, ...)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SessionGate::authenticate(token) ──────────► Unauthorized              │
//! │       │ Identity                                                        │
//! │       ▼                                                                 │
//! │  authorize(identity, action, owner) ────────► Forbidden                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Ledger / Catalog / Purchases / AccountService                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Store transaction ─► commit                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Public operations (no token): `register`, `login`, `get_product`,
//! `list_products`.

use std::sync::Arc;

use serde::Serialize;
use vending_core::{
    Account, Action, Identity, NewProduct, Product, ProductUpdate, PurchaseResult, Store,
};
use vending_db::{Database, DbConfig};

use crate::accounts::AccountService;
use crate::auth::{BearerAuthority, Claims};
use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::gate::{authorize, SessionGate};
use crate::ledger::Ledger;
use crate::password::PasswordHasher;
use crate::purchase::Purchases;
use crate::session::{MemorySessionStore, RedisSessionStore, SessionStore};
use crate::tx::TxPolicy;

/// What a successful login hands back.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    /// Opaque token that authorizes every guarded operation
    pub session_token: String,

    /// Signed credential for stateless callers
    pub bearer_token: String,

    pub account: Account,
}

/// Vending backend facade.
pub struct VendingService {
    gate: SessionGate,
    bearer: BearerAuthority,
    accounts: AccountService,
    ledger: Ledger,
    catalog: Catalog,
    purchases: Purchases,
}

impl VendingService {
    /// Wires the engine around an existing store and session store.
    pub fn new(
        config: &EngineConfig,
        store: Arc<dyn Store>,
        sessions: Arc<dyn SessionStore>,
    ) -> EngineResult<Self> {
        let policy = TxPolicy::new(config.store_timeout(), config.tx_max_attempts);
        let passwords =
            PasswordHasher::new(config.password_memory_kib, config.password_iterations)?;

        Ok(VendingService {
            gate: SessionGate::new(
                sessions,
                store.clone(),
                config.session_ttl(),
                config.session_timeout(),
                config.store_timeout(),
            ),
            bearer: BearerAuthority::new(config.jwt_secret.clone(), config.bearer_lifetime_secs),
            accounts: AccountService::new(store.clone(), policy, passwords),
            ledger: Ledger::new(store.clone(), policy),
            catalog: Catalog::new(store.clone(), policy),
            purchases: Purchases::new(store, policy),
        })
    }

    /// Opens the SQLite database and the session store named in `config`.
    ///
    /// Without `redis_url` sessions are kept in process memory and do not
    /// survive a restart.
    pub async fn connect(config: &EngineConfig) -> EngineResult<Self> {
        let db_config = DbConfig::new(&config.database_path)
            .max_connections(config.db_max_connections)
            .busy_timeout(config.store_timeout());

        let db = Database::new(db_config)
            .await
            .map_err(|e| EngineError::Internal(format!("Failed to open database: {e}")))?;
        let store: Arc<dyn Store> = Arc::new(db.store());

        let sessions: Arc<dyn SessionStore> = match &config.redis_url {
            Some(url) => {
                tracing::info!("Using Redis session store");
                Arc::new(RedisSessionStore::new(url).await?)
            }
            None => {
                tracing::warn!("REDIS_URL not set, sessions are kept in memory");
                Arc::new(MemorySessionStore::new())
            }
        };

        Self::new(config, store, sessions)
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        role: Option<&str>,
    ) -> EngineResult<Account> {
        self.accounts.register(username, password, role).await
    }

    /// Checks credentials, opens a session and issues a bearer credential.
    pub async fn login(&self, username: &str, password: &str) -> EngineResult<LoginOutcome> {
        let account = self.accounts.verify_credentials(username, password).await?;
        let identity = Identity::from(&account);

        let session_token = self.gate.open_session(&account.username).await?;
        let bearer_token = self.bearer.issue(&identity)?;

        tracing::info!(account_id = %account.id, username = %account.username, "Login succeeded");
        Ok(LoginOutcome {
            session_token,
            bearer_token,
            account,
        })
    }

    pub async fn authenticate(&self, session_token: &str) -> EngineResult<Identity> {
        self.gate.authenticate(session_token).await
    }

    /// Checks a bearer credential issued by [`login`](Self::login). This does
    /// not authorize any operation.
    pub fn verify_bearer(&self, bearer_token: &str) -> EngineResult<Claims> {
        self.bearer.verify(bearer_token)
    }

    pub async fn get_account(&self, session_token: &str, account_id: &str) -> EngineResult<Account> {
        self.guard(session_token, Action::ViewAccount, account_id).await?;
        self.accounts.get(account_id).await
    }

    pub async fn delete_account(&self, session_token: &str, account_id: &str) -> EngineResult<()> {
        self.guard(session_token, Action::DeleteAccount, account_id).await?;
        self.accounts.delete(account_id).await
    }

    pub async fn change_password(
        &self,
        session_token: &str,
        account_id: &str,
        old_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> EngineResult<Account> {
        self.guard(session_token, Action::ChangePassword, account_id).await?;
        self.accounts
            .change_password(account_id, old_password, new_password, confirm_password)
            .await
    }

    // =========================================================================
    // Ledger and purchases
    // =========================================================================

    pub async fn deposit(
        &self,
        session_token: &str,
        account_id: &str,
        amount: i64,
    ) -> EngineResult<Account> {
        self.guard(session_token, Action::Deposit, account_id).await?;
        self.ledger.deposit(account_id, amount).await
    }

    pub async fn reset(&self, session_token: &str, account_id: &str) -> EngineResult<Account> {
        self.guard(session_token, Action::ResetDeposit, account_id).await?;
        self.ledger.reset(account_id).await
    }

    pub async fn buy(
        &self,
        session_token: &str,
        account_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> EngineResult<PurchaseResult> {
        self.guard(session_token, Action::Buy, account_id).await?;
        self.purchases.buy(account_id, product_id, quantity).await
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub async fn get_product(&self, product_id: &str) -> EngineResult<Product> {
        self.catalog.get(product_id).await
    }

    pub async fn list_products(&self) -> EngineResult<Vec<Product>> {
        self.catalog.list().await
    }

    pub async fn create_product(
        &self,
        session_token: &str,
        product: NewProduct,
    ) -> EngineResult<Product> {
        let identity = self.gate.authenticate(session_token).await?;
        self.catalog.create(&identity, product).await
    }

    pub async fn update_product(
        &self,
        session_token: &str,
        product_id: &str,
        update: ProductUpdate,
    ) -> EngineResult<Product> {
        let identity = self.gate.authenticate(session_token).await?;
        self.catalog.update(&identity, product_id, update).await
    }

    pub async fn delete_product(&self, session_token: &str, product_id: &str) -> EngineResult<()> {
        let identity = self.gate.authenticate(session_token).await?;
        self.catalog.delete(&identity, product_id).await
    }

    /// Authenticates and checks `action` against the account being acted on.
    async fn guard(
        &self,
        session_token: &str,
        action: Action,
        account_id: &str,
    ) -> EngineResult<Identity> {
        let identity = self.gate.authenticate(session_token).await?;
        authorize(&identity, action, account_id)?;
        Ok(identity)
    }
}
