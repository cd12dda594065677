//! Webhook processing tests against a running server and database.
//!
//! The orders-create scenario mirrors Shopify's delivery shape: the shop in
//! the payload, a string order id, a decimal-string total, and no currency
//! (which must default to USD).

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde_json::json;

use vestia_core::ShopDomain;
use vestia_integration_tests::{api_base_url, test_pool, unique_shop};

#[tokio::test]
#[ignore = "Requires running API server and migrated database"]
async fn orders_create_stores_a_record_with_usd_default() {
    let base_url = api_base_url();
    let pool = test_pool().await;
    let client = Client::new();
    let shop = unique_shop();

    let resp = client
        .post(format!("{base_url}/webhooks/orders-create"))
        .json(&json!({
            "shop_domain": shop,
            "id": "123",
            "total_price": "19.99"
        }))
        .send()
        .await
        .expect("webhook request");
    assert_eq!(resp.status(), StatusCode::OK);

    let shop = ShopDomain::parse(&shop).expect("valid shop");
    let record = vestia_api::db::OrderRepository::new(&pool)
        .get(&shop, "123")
        .await
        .expect("query")
        .expect("record stored");

    assert_eq!(record.shopify_order_id, "123");
    assert_eq!(record.total_price, Decimal::new(1999, 2));
    assert_eq!(record.currency_code, "USD");

    sqlx::query("DELETE FROM orders WHERE shop = $1")
        .bind(shop.as_str())
        .execute(&pool)
        .await
        .expect("cleanup");
}

#[tokio::test]
#[ignore = "Requires running API server and migrated database"]
async fn orders_create_is_idempotent_on_redelivery() {
    let base_url = api_base_url();
    let pool = test_pool().await;
    let client = Client::new();
    let shop = unique_shop();

    for total in ["10.00", "99.99"] {
        let resp = client
            .post(format!("{base_url}/webhooks/orders-create"))
            .json(&json!({ "shop_domain": shop, "id": 777, "total_price": total }))
            .send()
            .await
            .expect("webhook request");
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let shop = ShopDomain::parse(&shop).expect("valid shop");
    let record = vestia_api::db::OrderRepository::new(&pool)
        .get(&shop, "777")
        .await
        .expect("query")
        .expect("record stored");

    // First delivery wins; the redelivery is a no-op.
    assert_eq!(record.total_price, Decimal::new(1000, 2));

    sqlx::query("DELETE FROM orders WHERE shop = $1")
        .bind(shop.as_str())
        .execute(&pool)
        .await
        .expect("cleanup");
}

#[tokio::test]
#[ignore = "Requires running API server and migrated database"]
async fn app_uninstalled_deletes_the_session() {
    use secrecy::SecretString;
    use vestia_api::db::{Session, SessionRepository};

    let base_url = api_base_url();
    let pool = test_pool().await;
    let client = Client::new();
    let shop = ShopDomain::parse(&unique_shop()).expect("valid shop");

    SessionRepository::new(&pool)
        .store(&Session {
            shop: shop.clone(),
            access_token: SecretString::from("shpat_to_be_uninstalled"),
            storefront_token: None,
            scope: String::new(),
            is_online: false,
            expires_at: None,
            custom_domain: None,
        })
        .await
        .expect("seed session");

    let resp = client
        .post(format!("{base_url}/webhooks/app-uninstalled"))
        .json(&json!({ "myshopify_domain": shop.as_str() }))
        .send()
        .await
        .expect("webhook request");
    assert_eq!(resp.status(), StatusCode::OK);

    assert!(
        SessionRepository::new(&pool)
            .get(&shop)
            .await
            .expect("get")
            .is_none(),
        "session must be gone after uninstall"
    );
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn invalid_signatures_are_rejected() {
    let base_url = api_base_url();
    let client = Client::new();

    let resp = client
        .post(format!("{base_url}/webhooks/orders-create"))
        .header("X-Shopify-Hmac-Sha256", "ZGVmaW5pdGVseSBub3QgdmFsaWQ=")
        .json(&json!({ "shop_domain": unique_shop(), "id": 1, "total_price": "1.00" }))
        .send()
        .await
        .expect("webhook request");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
