//! # Session Gate
//!
//! Turns a session token into an [`Identity`] and checks that identity
//! against the role and owner of the resource it wants to touch.
//!
//! ## Authentication
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  token ── empty / not a UUID ─────────────► Unauthorized (debug log)    │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  SessionStore::get(token) ── None ────────► Unauthorized (warn log)     │
//! │    │ Session { username, opened_at }                                    │
//! │    ▼                                                                    │
//! │  Store::find_account_by_username ── None ─► Unauthorized (warn log)     │
//! │    │ account                                                            │
//! │    ▼                                                                    │
//! │  opened_at < account.created_at ──────────► Unauthorized (warn log)     │
//! │    │  (username was freed and taken again)                              │
//! │    ▼                                                                    │
//! │  Identity { account_id, username, role }                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every failure carries the same message so a caller cannot tell a stale
//! token from a forged one.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;
use vending_core::validation::validate_uuid;
use vending_core::{permits, Action, Identity, Store};

use crate::error::{EngineError, EngineResult};
use crate::session::{Session, SessionStore};
use crate::tx::bounded;

/// Authentication and authorization in front of every guarded operation.
pub struct SessionGate {
    sessions: Arc<dyn SessionStore>,
    store: Arc<dyn Store>,
    session_ttl: Duration,
    session_timeout: Duration,
    store_timeout: Duration,
}

impl SessionGate {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        store: Arc<dyn Store>,
        session_ttl: Duration,
        session_timeout: Duration,
        store_timeout: Duration,
    ) -> Self {
        SessionGate {
            sessions,
            store,
            session_ttl,
            session_timeout,
            store_timeout,
        }
    }

    /// Resolves a session token to the identity that logged in.
    pub async fn authenticate(&self, token: &str) -> EngineResult<Identity> {
        let token = token.trim();

        if token.is_empty() {
            tracing::debug!("Missing session token");
            return Err(EngineError::Unauthorized);
        }

        if validate_uuid("session token", token).is_err() {
            tracing::debug!("Malformed session token");
            return Err(EngineError::Unauthorized);
        }

        let session = bounded(self.session_timeout, "session lookup", self.sessions.get(token))
            .await?
            .ok_or_else(|| {
                tracing::warn!("Unknown or expired session");
                EngineError::Unauthorized
            })?;

        let account = bounded(
            self.store_timeout,
            "account lookup",
            self.store.find_account_by_username(&session.username),
        )
        .await?
        .ok_or_else(|| {
            tracing::warn!(username = %session.username, "Session refers to a deleted account");
            EngineError::Unauthorized
        })?;

        if session.opened_at < account.created_at {
            tracing::warn!(
                username = %session.username,
                account_id = %account.id,
                "Session predates the account holding its username"
            );
            return Err(EngineError::Unauthorized);
        }

        Ok(Identity::from(&account))
    }

    /// Mints a fresh session token for `username` and stores it with the
    /// configured TTL.
    pub async fn open_session(&self, username: &str) -> EngineResult<String> {
        let token = Uuid::new_v4().to_string();
        let session = Session::open(username);

        bounded(
            self.session_timeout,
            "session store",
            self.sessions.put(&token, &session, self.session_ttl),
        )
        .await?;

        tracing::info!(
            username = %username,
            ttl_secs = self.session_ttl.as_secs(),
            "Session opened"
        );
        Ok(token)
    }
}

/// Fails with `Forbidden` unless `identity` owns the resource and holds the
/// role `action` requires.
pub fn authorize(identity: &Identity, action: Action, owner_id: &str) -> EngineResult<()> {
    if permits(identity, action, owner_id) {
        return Ok(());
    }

    tracing::warn!(
        account_id = %identity.account_id,
        role = %identity.role,
        owner_id = %owner_id,
        action = action.label(),
        "Access denied"
    );
    Err(EngineError::forbidden(action))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use vending_core::{NewAccount, Role};
    use vending_db::{Database, DbConfig};

    async fn setup() -> (SessionGate, Arc<MemorySessionStore>, Arc<dyn Store>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store: Arc<dyn Store> = Arc::new(db.store());
        let sessions = Arc::new(MemorySessionStore::new());

        let gate = SessionGate::new(
            sessions.clone(),
            store.clone(),
            Duration::from_secs(7200),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        (gate, sessions, store)
    }

    async fn create(store: &Arc<dyn Store>, username: &str, role: Role) -> String {
        store
            .create_account(NewAccount {
                username: username.to_string(),
                password_hash: "hash".to_string(),
                role,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_open_session_then_authenticate() {
        let (gate, _, store) = setup().await;
        let id = create(&store, "alice", Role::Buyer).await;

        let token = gate.open_session("alice").await.unwrap();
        let identity = gate.authenticate(&token).await.unwrap();

        assert_eq!(identity.account_id, id);
        assert_eq!(identity.username, "alice");
        assert_eq!(identity.role, Role::Buyer);
    }

    #[tokio::test]
    async fn test_bad_tokens_are_unauthorized() {
        let (gate, _, _) = setup().await;

        for token in ["", "   ", "not-a-uuid"] {
            assert!(matches!(
                gate.authenticate(token).await,
                Err(EngineError::Unauthorized)
            ));
        }

        let unknown = Uuid::new_v4().to_string();
        assert!(matches!(
            gate.authenticate(&unknown).await,
            Err(EngineError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_session_of_deleted_account_is_unauthorized() {
        let (gate, _, store) = setup().await;
        let id = create(&store, "ghost", Role::Buyer).await;

        let token = gate.open_session("ghost").await.unwrap();
        store.delete_account(&id).await.unwrap();

        assert!(matches!(
            gate.authenticate(&token).await,
            Err(EngineError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_session_is_stored_under_username() {
        let (gate, sessions, _) = setup().await;
        let token = gate.open_session("carol").await.unwrap();

        let session = sessions.get(&token).await.unwrap().unwrap();
        assert_eq!(session.username, "carol");
    }

    #[tokio::test]
    async fn test_session_does_not_carry_over_to_reused_username() {
        let (gate, _, store) = setup().await;
        let first_id = create(&store, "alice", Role::Buyer).await;
        let old_token = gate.open_session("alice").await.unwrap();

        store.delete_account(&first_id).await.unwrap();
        let second_id = create(&store, "alice", Role::Seller).await;
        assert_ne!(first_id, second_id);

        assert!(matches!(
            gate.authenticate(&old_token).await,
            Err(EngineError::Unauthorized)
        ));

        let new_token = gate.open_session("alice").await.unwrap();
        let identity = gate.authenticate(&new_token).await.unwrap();
        assert_eq!(identity.account_id, second_id);
    }

    #[test]
    fn test_authorize_names_action() {
        let seller = Identity {
            account_id: "s-1".to_string(),
            username: "seller".to_string(),
            role: Role::Seller,
        };

        assert!(authorize(&seller, Action::UpdateProduct, "s-1").is_ok());

        let err = authorize(&seller, Action::Deposit, "s-1").unwrap_err();
        assert_eq!(err.to_string(), "insufficient rights to make deposit");

        let err = authorize(&seller, Action::UpdateProduct, "s-2").unwrap_err();
        assert_eq!(err.to_string(), "insufficient rights to update product");
    }
}
