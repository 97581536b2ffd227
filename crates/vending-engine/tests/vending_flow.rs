//! End-to-end flows through `VendingService` against a real SQLite store and
//! the in-memory session store.

use std::sync::Arc;
use std::time::Duration;

use vending_core::{Coins, Denomination, NewProduct, ProductUpdate, Store};
use vending_db::{Database, DbConfig};
use vending_engine::{
    EngineConfig, EngineError, ErrorKind, MemorySessionStore, VendingService,
};

fn test_config() -> EngineConfig {
    EngineConfig {
        jwt_secret: "integration-secret".to_string(),
        password_memory_kib: 64,
        password_iterations: 1,
        store_timeout_ms: 5000,
        ..EngineConfig::default()
    }
}

async fn service_with(config: EngineConfig, db_config: DbConfig) -> VendingService {
    let db = Database::new(db_config).await.unwrap();
    let store: Arc<dyn Store> = Arc::new(db.store());
    VendingService::new(&config, store, Arc::new(MemorySessionStore::new())).unwrap()
}

async fn service() -> VendingService {
    service_with(test_config(), DbConfig::in_memory()).await
}

/// Registers and logs in; returns (session token, account id).
async fn sign_up(service: &VendingService, username: &str, role: &str) -> (String, String) {
    service
        .register(username, "password", Some(role))
        .await
        .unwrap();
    let login = service.login(username, "password").await.unwrap();
    (login.session_token, login.account.id)
}

fn cola(stock: i64) -> NewProduct {
    NewProduct {
        name: "Cola".to_string(),
        price: Coins::new(25),
        stock,
    }
}

#[tokio::test]
async fn test_buy_flow_end_to_end() {
    let service = service().await;

    let (seller_token, _) = sign_up(&service, "seller", "seller").await;
    let product = service
        .create_product(&seller_token, cola(3))
        .await
        .unwrap();

    let (buyer_token, buyer_id) = sign_up(&service, "buyer", "buyer").await;
    service.deposit(&buyer_token, &buyer_id, 50).await.unwrap();
    let account = service.deposit(&buyer_token, &buyer_id, 50).await.unwrap();
    assert_eq!(account.balance, Coins::new(100));

    let result = service
        .buy(&buyer_token, &buyer_id, &product.id, 3)
        .await
        .unwrap();

    assert_eq!(result.amount_spent, Coins::new(75));
    assert_eq!(result.product_name, "Cola");
    assert_eq!(result.quantity_purchased, 3);
    assert_eq!(result.change.count(Denomination::Twenty), 1);
    assert_eq!(result.change.count(Denomination::Five), 1);
    assert_eq!(result.change.coin_count(), 2);
    assert!(result.change.unrepresentable().is_zero());

    assert_eq!(service.get_product(&product.id).await.unwrap().stock, 0);
    let account = service.get_account(&buyer_token, &buyer_id).await.unwrap();
    assert!(account.balance.is_zero());

    let err = service
        .buy(&buyer_token, &buyer_id, &product.id, 3)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientStock);
}

#[tokio::test]
async fn test_missing_or_bad_session_is_unauthorized() {
    let service = service().await;
    let (_, buyer_id) = sign_up(&service, "buyer", "buyer").await;

    for token in ["", "garbage", "7d3f0c56-2a11-4f4e-9a59-3b0f8f0e0a11"] {
        let err = service.deposit(token, &buyer_id, 10).await.unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized));
        assert_eq!(err.to_response().message, "not authorized, please log in");
    }
}

#[tokio::test]
async fn test_bearer_is_not_a_session() {
    let service = service().await;
    service.register("buyer", "password", None).await.unwrap();
    let login = service.login("buyer", "password").await.unwrap();

    let claims = service.verify_bearer(&login.bearer_token).unwrap();
    assert_eq!(claims.sub, login.account.id);
    assert_eq!(claims.username, "buyer");

    let err = service
        .deposit(&login.bearer_token, &login.account.id, 10)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_acting_on_someone_else_is_forbidden() {
    let service = service().await;
    let (_, alice_id) = sign_up(&service, "alice", "buyer").await;
    let (bob_token, _) = sign_up(&service, "bob", "buyer").await;

    let err = service.deposit(&bob_token, &alice_id, 10).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(err.to_string(), "insufficient rights to make deposit");

    let err = service.reset(&bob_token, &alice_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = service.get_account(&bob_token, &alice_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn test_roles_are_enforced() {
    let service = service().await;
    let (seller_token, seller_id) = sign_up(&service, "seller", "seller").await;
    let (buyer_token, buyer_id) = sign_up(&service, "buyer", "buyer").await;

    let err = service.deposit(&seller_token, &seller_id, 10).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = service
        .create_product(&buyer_token, cola(1))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "insufficient rights to create product");

    let product = service.create_product(&seller_token, cola(1)).await.unwrap();
    let err = service
        .buy(&seller_token, &seller_id, &product.id, 1)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "insufficient rights to make purchase");

    let err = service
        .update_product(
            &buyer_token,
            &product.id,
            ProductUpdate {
                name: "Free Cola".to_string(),
                price: Coins::new(5),
                stock: 100,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    // Buyer's own balance is untouched by all of the above
    let account = service.get_account(&buyer_token, &buyer_id).await.unwrap();
    assert!(account.balance.is_zero());
}

#[tokio::test]
async fn test_catalog_reads_are_public() {
    let service = service().await;
    let (seller_token, _) = sign_up(&service, "seller", "seller").await;
    let product = service.create_product(&seller_token, cola(2)).await.unwrap();

    assert_eq!(service.list_products().await.unwrap().len(), 1);
    assert_eq!(service.get_product(&product.id).await.unwrap().name, "Cola");
    assert_eq!(
        service.get_product("missing").await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_look_the_same() {
    let service = service().await;
    service.register("alice", "password", None).await.unwrap();

    let wrong = service.login("alice", "nope").await.unwrap_err().to_response();
    let unknown = service.login("nobody", "password").await.unwrap_err().to_response();

    assert_eq!(wrong.code, ErrorKind::Unauthorized);
    assert_eq!(wrong.code, unknown.code);
    assert_eq!(wrong.message, unknown.message);
}

#[tokio::test]
async fn test_expired_session_is_unauthorized() {
    let config = EngineConfig {
        session_ttl_secs: 1,
        ..test_config()
    };
    let service = service_with(config, DbConfig::in_memory()).await;
    let (token, id) = sign_up(&service, "buyer", "buyer").await;

    service.deposit(&token, &id, 10).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let err = service.deposit(&token, &id, 10).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_duplicate_username_is_constraint_violation() {
    let service = service().await;
    service.register("alice", "password", None).await.unwrap();

    let err = service
        .register("alice", "password", Some("seller"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
}

#[tokio::test]
async fn test_non_positive_price_is_invalid() {
    let service = service().await;
    let (token, _) = sign_up(&service, "seller", "seller").await;

    let err = service
        .create_product(
            &token,
            NewProduct {
                price: Coins::zero(),
                ..cola(1)
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let product = service.create_product(&token, cola(1)).await.unwrap();
    let err = service
        .update_product(
            &token,
            &product.id,
            ProductUpdate {
                name: "Cola".to_string(),
                price: Coins::new(-1),
                stock: 1,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_seller_with_products_cannot_be_deleted() {
    let service = service().await;
    let (token, seller_id) = sign_up(&service, "seller", "seller").await;
    let product = service.create_product(&token, cola(5)).await.unwrap();

    let err = service.delete_account(&token, &seller_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

    service.delete_product(&token, &product.id).await.unwrap();
    service.delete_account(&token, &seller_id).await.unwrap();

    // The session outlives the account but no longer authenticates
    let err = service.authenticate(&token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_change_password_then_login() {
    let service = service().await;
    let (token, id) = sign_up(&service, "alice", "buyer").await;

    service
        .change_password(&token, &id, "password", "new-password", "new-password")
        .await
        .unwrap();

    assert!(service.login("alice", "password").await.is_err());
    assert!(service.login("alice", "new-password").await.is_ok());
}

#[tokio::test]
async fn test_reset_returns_balance_to_zero() {
    let service = service().await;
    let (token, id) = sign_up(&service, "buyer", "buyer").await;

    service.deposit(&token, &id, 100).await.unwrap();
    assert!(service.reset(&token, &id).await.unwrap().balance.is_zero());
    assert!(service.reset(&token, &id).await.unwrap().balance.is_zero());

    let err = service.deposit(&token, &id, 7).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_deposits_do_not_lose_updates() {
    let dir = tempfile::tempdir().unwrap();
    let db_config = DbConfig::new(dir.path().join("vending.db")).max_connections(4);
    let service = service_with(test_config(), db_config).await;
    let (token, id) = sign_up(&service, "buyer", "buyer").await;

    let (a, b) = tokio::join!(
        service.deposit(&token, &id, 10),
        service.deposit(&token, &id, 20)
    );
    a.unwrap();
    b.unwrap();

    let account = service.get_account(&token, &id).await.unwrap();
    assert_eq!(account.balance, Coins::new(30));
    assert_eq!(account.version, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_buyers_racing_for_the_last_unit() {
    let dir = tempfile::tempdir().unwrap();
    let db_config = DbConfig::new(dir.path().join("vending.db")).max_connections(4);
    let service = service_with(test_config(), db_config).await;

    let (seller_token, _) = sign_up(&service, "seller", "seller").await;
    let product = service.create_product(&seller_token, cola(1)).await.unwrap();

    let (alice_token, alice_id) = sign_up(&service, "alice", "buyer").await;
    let (bob_token, bob_id) = sign_up(&service, "bob", "buyer").await;
    service.deposit(&alice_token, &alice_id, 50).await.unwrap();
    service.deposit(&bob_token, &bob_id, 50).await.unwrap();

    let (alice, bob) = tokio::join!(
        service.buy(&alice_token, &alice_id, &product.id, 1),
        service.buy(&bob_token, &bob_id, &product.id, 1)
    );

    let (winner_token, winner_id, loser_token, loser_id, lost) = match (alice, bob) {
        (Ok(_), Err(err)) => (&alice_token, &alice_id, &bob_token, &bob_id, err),
        (Err(err), Ok(_)) => (&bob_token, &bob_id, &alice_token, &alice_id, err),
        (a, b) => panic!("expected exactly one purchase to succeed: {a:?} / {b:?}"),
    };
    assert_eq!(lost.kind(), ErrorKind::InsufficientStock);

    assert_eq!(service.get_product(&product.id).await.unwrap().stock, 0);

    let winner = service.get_account(winner_token, winner_id).await.unwrap();
    assert_eq!(winner.balance, Coins::new(25));

    let loser = service.get_account(loser_token, loser_id).await.unwrap();
    assert_eq!(loser.balance, Coins::new(50));
    assert_eq!(loser.version, 1);
}

#[tokio::test]
async fn test_old_session_does_not_follow_a_reused_username() {
    let service = service().await;
    let (old_token, old_id) = sign_up(&service, "alice", "buyer").await;
    service.delete_account(&old_token, &old_id).await.unwrap();

    let (new_token, new_id) = sign_up(&service, "alice", "buyer").await;
    assert_ne!(old_id, new_id);

    let err = service.authenticate(&old_token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    let err = service.deposit(&old_token, &new_id, 10).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let identity = service.authenticate(&new_token).await.unwrap();
    assert_eq!(identity.account_id, new_id);
}
