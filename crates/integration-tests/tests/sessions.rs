//! Session repository round-trips against a real database.
//!
//! Requires `DATABASE_URL` pointing at a migrated database.

use secrecy::{ExposeSecret, SecretString};

use vestia_api::db::{Session, SessionRepository};
use vestia_core::ShopDomain;
use vestia_integration_tests::{test_pool, unique_shop};

fn session_for(shop: &ShopDomain) -> Session {
    Session {
        shop: shop.clone(),
        access_token: SecretString::from("shpat_integration_test"),
        storefront_token: Some(SecretString::from("shpsf_integration_test")),
        scope: "read_products,read_orders".to_owned(),
        is_online: false,
        expires_at: None,
        custom_domain: Some("shop.example.com".to_owned()),
    }
}

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn store_get_delete_round_trip() {
    let pool = test_pool().await;
    let repo = SessionRepository::new(&pool);
    let shop = ShopDomain::parse(&unique_shop()).expect("valid shop");
    let session = session_for(&shop);

    repo.store(&session).await.expect("store");

    let fetched = repo.get(&shop).await.expect("get").expect("session exists");
    assert_eq!(fetched.shop, session.shop);
    assert_eq!(
        fetched.access_token.expose_secret(),
        session.access_token.expose_secret()
    );
    assert_eq!(
        fetched.storefront_token.as_ref().map(ExposeSecret::expose_secret),
        session.storefront_token.as_ref().map(ExposeSecret::expose_secret)
    );
    assert_eq!(fetched.scope, session.scope);
    assert_eq!(fetched.is_online, session.is_online);
    assert_eq!(fetched.expires_at, session.expires_at);
    assert_eq!(fetched.custom_domain, session.custom_domain);

    assert!(repo.delete(&shop).await.expect("delete"));
    assert!(repo.get(&shop).await.expect("get after delete").is_none());
}

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn reinstall_overwrites_the_previous_session() {
    let pool = test_pool().await;
    let repo = SessionRepository::new(&pool);
    let shop = ShopDomain::parse(&unique_shop()).expect("valid shop");

    repo.store(&session_for(&shop)).await.expect("first install");

    let mut second = session_for(&shop);
    second.access_token = SecretString::from("shpat_rotated");
    second.scope = "read_products".to_owned();
    repo.store(&second).await.expect("reinstall");

    let fetched = repo.get(&shop).await.expect("get").expect("session exists");
    assert_eq!(fetched.access_token.expose_secret(), "shpat_rotated");
    assert_eq!(fetched.scope, "read_products");

    repo.delete(&shop).await.expect("cleanup");
}

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn empty_access_tokens_are_rejected() {
    let pool = test_pool().await;
    let repo = SessionRepository::new(&pool);
    let shop = ShopDomain::parse(&unique_shop()).expect("valid shop");

    let mut session = session_for(&shop);
    session.access_token = SecretString::from("");

    assert!(repo.store(&session).await.is_err());
    assert!(repo.get(&shop).await.expect("get").is_none());
}
