//! Shopify Admin API GraphQL client.
//!
//! One client serves every installed shop: the per-shop access token is
//! loaded from the session store and passed into each call. Queries are raw
//! GraphQL documents; responses deserialize through the envelope in
//! [`super::error`] and every failure is normalized there before it leaves
//! this module.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::instrument;

use vestia_core::ShopDomain;

use crate::config::ShopifyAppConfig;

use super::error::{GraphQLResponse, UpstreamError};

// =============================================================================
// GraphQL documents
// =============================================================================

const PRODUCTS_QUERY: &str = r"
query WidgetProducts($first: Int!) {
  products(first: $first, sortKey: CREATED_AT, reverse: true) {
    edges {
      node {
        id
        title
        handle
        status
        onlineStoreUrl
        totalInventory
        featuredImage { url }
        priceRangeV2 { minVariantPrice { amount currencyCode } }
      }
    }
  }
}";

const ORDERS_QUERY: &str = r"
query WidgetOrders($first: Int!, $query: String!) {
  orders(first: $first, query: $query, sortKey: CREATED_AT, reverse: true) {
    edges {
      node {
        id
        name
        createdAt
        note
        email
        displayFulfillmentStatus
        displayFinancialStatus
        totalPriceSet { shopMoney { amount currencyCode } }
        fulfillments { trackingInfo { company number url } }
      }
    }
  }
}";

const POLICIES_QUERY: &str = r"
query WidgetPolicies {
  shop {
    shopPolicies { type body url }
  }
}";

const CUSTOMER_QUERY: &str = r"
query WidgetCustomer($query: String!) {
  customers(first: 1, query: $query) {
    edges { node { id email note } }
  }
}";

const ORDER_NOTE_MUTATION: &str = r"
mutation WidgetOrderNote($input: OrderInput!) {
  orderUpdate(input: $input) {
    order { id }
    userErrors { field message }
  }
}";

const CUSTOMER_NOTE_MUTATION: &str = r"
mutation WidgetCustomerNote($input: CustomerInput!) {
  customerUpdate(input: $input) {
    customer { id }
    userErrors { field message }
  }
}";

const STOREFRONT_TOKEN_MUTATION: &str = r#"
mutation WidgetStorefrontToken {
  storefrontAccessTokenCreate(input: { title: "vestia-widget" }) {
    storefrontAccessToken { accessToken }
    userErrors { field message }
  }
}"#;

// =============================================================================
// Public types
// =============================================================================

/// A money amount as Shopify returns it (decimal string + currency).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Money {
    pub amount: String,
    #[serde(rename = "currencyCode")]
    pub currency_code: String,
}

/// Product data shaped for the widget's product rail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: String,
    pub title: String,
    pub handle: String,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<Money>,
    pub available: bool,
}

/// Shipment tracking details from a fulfillment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingInfo {
    pub company: Option<String>,
    pub number: Option<String>,
    pub url: Option<String>,
}

/// Order data shaped for chat answers and the orders endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: String,
    /// Display name including the hash, e.g. `#1042`.
    pub name: String,
    pub created_at: String,
    pub email: Option<String>,
    pub note: Option<String>,
    pub fulfillment_status: String,
    pub financial_status: String,
    pub total: Option<Money>,
    pub tracking: Vec<TrackingInfo>,
}

/// One of the shop's published policies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopPolicy {
    /// Policy type as Shopify reports it, e.g. `REFUND_POLICY`.
    pub kind: String,
    /// Human-readable title derived from the type.
    pub title: String,
    /// Policy body (HTML).
    pub body: String,
    pub url: Option<String>,
}

/// A customer located by email, used for ticket notes.
#[derive(Debug, Clone)]
pub struct CustomerSummary {
    pub id: String,
    pub email: Option<String>,
    pub note: Option<String>,
}

/// Response from the OAuth code exchange.
#[derive(Debug, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub scope: String,
}

// =============================================================================
// Wire types (Admin API response shapes)
// =============================================================================

#[derive(Debug, Deserialize)]
struct Connection<T> {
    edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Debug, Deserialize)]
struct ProductsData {
    products: Connection<ProductNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductNode {
    id: String,
    title: String,
    handle: String,
    status: String,
    online_store_url: Option<String>,
    total_inventory: Option<i64>,
    featured_image: Option<ImageNode>,
    price_range_v2: Option<PriceRangeNode>,
}

#[derive(Debug, Deserialize)]
struct ImageNode {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceRangeNode {
    min_variant_price: Money,
}

#[derive(Debug, Deserialize)]
struct OrdersData {
    orders: Connection<OrderNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderNode {
    id: String,
    name: String,
    created_at: String,
    note: Option<String>,
    email: Option<String>,
    display_fulfillment_status: String,
    display_financial_status: String,
    total_price_set: Option<MoneyBagNode>,
    #[serde(default)]
    fulfillments: Vec<FulfillmentNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoneyBagNode {
    shop_money: Money,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FulfillmentNode {
    #[serde(default)]
    tracking_info: Vec<TrackingInfo>,
}

#[derive(Debug, Deserialize)]
struct PoliciesData {
    shop: PoliciesShopNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PoliciesShopNode {
    #[serde(default)]
    shop_policies: Vec<PolicyNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolicyNode {
    #[serde(rename = "type")]
    policy_type: String,
    body: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CustomersData {
    customers: Connection<CustomerNode>,
}

#[derive(Debug, Deserialize)]
struct CustomerNode {
    id: String,
    email: Option<String>,
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderNoteData {
    order_update: MutationPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerNoteData {
    customer_update: MutationPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorefrontTokenData {
    storefront_access_token_create: StorefrontTokenPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorefrontTokenPayload {
    storefront_access_token: Option<StorefrontTokenNode>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorefrontTokenNode {
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MutationPayload {
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
struct UserError {
    message: String,
}

// =============================================================================
// ShopifyClient
// =============================================================================

/// Shopify Admin API client.
///
/// Cheaply cloneable; holds the app credentials and one connection pool for
/// all shops.
#[derive(Clone)]
pub struct ShopifyClient {
    inner: Arc<ShopifyClientInner>,
}

struct ShopifyClientInner {
    client: reqwest::Client,
    api_key: String,
    api_secret: SecretString,
    api_version: String,
}

impl ShopifyClient {
    /// Create a new Admin API client from the app credentials.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created, which does not happen
    /// with the default TLS configuration.
    #[must_use]
    pub fn new(config: &ShopifyAppConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            inner: Arc::new(ShopifyClientInner {
                client,
                api_key: config.api_key.clone(),
                api_secret: config.api_secret.clone(),
                api_version: config.api_version.clone(),
            }),
        }
    }

    fn graphql_endpoint(&self, shop: &ShopDomain) -> String {
        format!(
            "https://{shop}/admin/api/{}/graphql.json",
            self.inner.api_version
        )
    }

    // =========================================================================
    // OAuth
    // =========================================================================

    /// Build the Shopify authorization URL for the install redirect.
    #[must_use]
    pub fn authorization_url(&self, shop: &ShopDomain, redirect_uri: &str, scopes: &str, state: &str) -> String {
        let base = format!("https://{shop}/admin/oauth/authorize");
        url::Url::parse_with_params(
            &base,
            &[
                ("client_id", self.inner.api_key.as_str()),
                ("scope", scopes),
                ("redirect_uri", redirect_uri),
                ("state", state),
            ],
        )
        .map_or(base, String::from)
    }

    /// Exchange an OAuth authorization code for an Admin access token.
    ///
    /// # Errors
    ///
    /// Returns a normalized [`UpstreamError`] on transport failure or a
    /// non-success response from Shopify.
    #[instrument(skip(self, code), fields(shop = %shop))]
    pub async fn exchange_code(
        &self,
        shop: &ShopDomain,
        code: &str,
    ) -> Result<AccessTokenResponse, UpstreamError> {
        let response = self
            .inner
            .client
            .post(format!("https://{shop}/admin/oauth/access_token"))
            .json(&json!({
                "client_id": self.inner.api_key,
                "client_secret": self.inner.api_secret.expose_secret(),
                "code": code,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_status(status.as_u16(), &body));
        }

        Ok(response.json().await?)
    }

    /// Create a storefront access token for customer-facing product queries.
    ///
    /// Called once during install; the token is stored on the session.
    ///
    /// # Errors
    ///
    /// Returns a normalized [`UpstreamError`]; mutation user errors are
    /// non-retryable.
    #[instrument(skip(self, token), fields(shop = %shop))]
    pub async fn create_storefront_token(
        &self,
        shop: &ShopDomain,
        token: &SecretString,
    ) -> Result<String, UpstreamError> {
        let data: StorefrontTokenData = self
            .execute(shop, token, STOREFRONT_TOKEN_MUTATION, json!({}))
            .await?;

        let payload = data.storefront_access_token_create;
        check_user_errors(&payload.user_errors)?;

        payload
            .storefront_access_token
            .map(|t| t.access_token)
            .ok_or_else(|| UpstreamError::other("storefront token missing from response"))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// List products for the widget's product rail.
    ///
    /// # Errors
    ///
    /// Returns a normalized [`UpstreamError`] on any upstream failure.
    #[instrument(skip(self, token), fields(shop = %shop))]
    pub async fn list_products(
        &self,
        shop: &ShopDomain,
        token: &SecretString,
        first: u32,
    ) -> Result<Vec<ProductSummary>, UpstreamError> {
        let data: ProductsData = self
            .execute(shop, token, PRODUCTS_QUERY, json!({ "first": first }))
            .await?;

        Ok(data
            .products
            .edges
            .into_iter()
            .map(|edge| convert_product(edge.node))
            .collect())
    }

    /// Find a single order by its order number (e.g. `1042` for `#1042`).
    ///
    /// # Errors
    ///
    /// Returns a normalized [`UpstreamError`] on any upstream failure.
    #[instrument(skip(self, token), fields(shop = %shop, number = %number))]
    pub async fn find_order_by_number(
        &self,
        shop: &ShopDomain,
        token: &SecretString,
        number: &str,
    ) -> Result<Option<OrderSummary>, UpstreamError> {
        let data: OrdersData = self
            .execute(
                shop,
                token,
                ORDERS_QUERY,
                json!({ "first": 1, "query": format!("name:#{number}") }),
            )
            .await?;

        Ok(data
            .orders
            .edges
            .into_iter()
            .next()
            .map(|edge| convert_order(edge.node)))
    }

    /// Find a customer's recent orders by email, newest first.
    ///
    /// # Errors
    ///
    /// Returns a normalized [`UpstreamError`] on any upstream failure.
    #[instrument(skip(self, token, email), fields(shop = %shop))]
    pub async fn find_orders_by_email(
        &self,
        shop: &ShopDomain,
        token: &SecretString,
        email: &str,
        first: u32,
    ) -> Result<Vec<OrderSummary>, UpstreamError> {
        let data: OrdersData = self
            .execute(
                shop,
                token,
                ORDERS_QUERY,
                json!({ "first": first, "query": format!("email:{email}") }),
            )
            .await?;

        Ok(data
            .orders
            .edges
            .into_iter()
            .map(|edge| convert_order(edge.node))
            .collect())
    }

    /// Fetch the shop's published policies.
    ///
    /// # Errors
    ///
    /// Returns a normalized [`UpstreamError`] on any upstream failure.
    #[instrument(skip(self, token), fields(shop = %shop))]
    pub async fn shop_policies(
        &self,
        shop: &ShopDomain,
        token: &SecretString,
    ) -> Result<Vec<ShopPolicy>, UpstreamError> {
        let data: PoliciesData = self
            .execute(shop, token, POLICIES_QUERY, json!({}))
            .await?;

        Ok(data
            .shop
            .shop_policies
            .into_iter()
            .map(|node| ShopPolicy {
                title: policy_title(&node.policy_type).to_owned(),
                kind: node.policy_type,
                body: node.body,
                url: node.url,
            })
            .collect())
    }

    /// Find a customer by email for ticket recording.
    ///
    /// # Errors
    ///
    /// Returns a normalized [`UpstreamError`] on any upstream failure.
    #[instrument(skip(self, token, email), fields(shop = %shop))]
    pub async fn find_customer_by_email(
        &self,
        shop: &ShopDomain,
        token: &SecretString,
        email: &str,
    ) -> Result<Option<CustomerSummary>, UpstreamError> {
        let data: CustomersData = self
            .execute(
                shop,
                token,
                CUSTOMER_QUERY,
                json!({ "query": format!("email:{email}") }),
            )
            .await?;

        Ok(data.customers.edges.into_iter().next().map(|edge| {
            CustomerSummary {
                id: edge.node.id,
                email: edge.node.email,
                note: edge.node.note,
            }
        }))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Replace an order's note. Callers append to the existing note to keep
    /// prior tickets.
    ///
    /// # Errors
    ///
    /// Returns a normalized [`UpstreamError`]; mutation user errors are
    /// non-retryable.
    #[instrument(skip(self, token, note), fields(shop = %shop, order_id = %order_id))]
    pub async fn update_order_note(
        &self,
        shop: &ShopDomain,
        token: &SecretString,
        order_id: &str,
        note: &str,
    ) -> Result<(), UpstreamError> {
        let data: OrderNoteData = self
            .execute(
                shop,
                token,
                ORDER_NOTE_MUTATION,
                json!({ "input": { "id": order_id, "note": note } }),
            )
            .await?;

        check_user_errors(&data.order_update.user_errors)
    }

    /// Replace a customer's note. Callers append to the existing note.
    ///
    /// # Errors
    ///
    /// Returns a normalized [`UpstreamError`]; mutation user errors are
    /// non-retryable.
    #[instrument(skip(self, token, note), fields(shop = %shop, customer_id = %customer_id))]
    pub async fn update_customer_note(
        &self,
        shop: &ShopDomain,
        token: &SecretString,
        customer_id: &str,
        note: &str,
    ) -> Result<(), UpstreamError> {
        let data: CustomerNoteData = self
            .execute(
                shop,
                token,
                CUSTOMER_NOTE_MUTATION,
                json!({ "input": { "id": customer_id, "note": note } }),
            )
            .await?;

        check_user_errors(&data.customer_update.user_errors)
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// Execute one GraphQL document against a shop's Admin API.
    ///
    /// This is the single normalization point: rate limits, non-success
    /// statuses, GraphQL error arrays, and parse failures all leave here as
    /// [`UpstreamError`].
    async fn execute<T: DeserializeOwned>(
        &self,
        shop: &ShopDomain,
        token: &SecretString,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, UpstreamError> {
        let response = self
            .inner
            .client
            .post(self.graphql_endpoint(shop))
            .header("X-Shopify-Access-Token", token.expose_secret())
            .header("Content-Type", "application/json")
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(UpstreamError::rate_limited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Shopify Admin API returned non-success status"
            );
            return Err(UpstreamError::from_status(status.as_u16(), &body));
        }

        let envelope: GraphQLResponse<T> = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse Shopify GraphQL response"
            );
            UpstreamError::other(format!("invalid GraphQL response: {e}"))
        })?;

        if let Some(errors) = envelope.errors
            && !errors.is_empty()
        {
            tracing::debug!(count = errors.len(), "GraphQL errors in response");
            return Err(UpstreamError::from_graphql(status.as_u16(), &errors));
        }

        envelope
            .data
            .ok_or_else(|| UpstreamError::other("GraphQL response had no data"))
    }
}

fn check_user_errors(errors: &[UserError]) -> Result<(), UpstreamError> {
    if let Some(first) = errors.first() {
        return Err(UpstreamError::other(format!(
            "user error: {}",
            first.message
        )));
    }
    Ok(())
}

fn convert_product(node: ProductNode) -> ProductSummary {
    let available =
        node.status == "ACTIVE" && node.total_inventory.is_none_or(|n| n > 0);

    ProductSummary {
        id: node.id,
        title: node.title,
        handle: node.handle,
        url: node.online_store_url,
        image_url: node.featured_image.map(|i| i.url),
        price: node.price_range_v2.map(|r| r.min_variant_price),
        available,
    }
}

fn convert_order(node: OrderNode) -> OrderSummary {
    OrderSummary {
        id: node.id,
        name: node.name,
        created_at: node.created_at,
        email: node.email,
        note: node.note,
        fulfillment_status: node.display_fulfillment_status,
        financial_status: node.display_financial_status,
        total: node.total_price_set.map(|set| set.shop_money),
        tracking: node
            .fulfillments
            .into_iter()
            .flat_map(|f| f.tracking_info)
            .collect(),
    }
}

/// Human-readable titles for Shopify's policy type names.
fn policy_title(policy_type: &str) -> &'static str {
    match policy_type {
        "REFUND_POLICY" => "Refund policy",
        "PRIVACY_POLICY" => "Privacy policy",
        "TERMS_OF_SERVICE" => "Terms of service",
        "SHIPPING_POLICY" => "Shipping policy",
        "SUBSCRIPTION_POLICY" => "Subscription policy",
        _ => "Store policy",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_products_with_missing_optionals() {
        let node: ProductNode = serde_json::from_value(json!({
            "id": "gid://shopify/Product/1",
            "title": "Linen Shirt",
            "handle": "linen-shirt",
            "status": "ACTIVE",
            "onlineStoreUrl": null,
            "totalInventory": 0,
            "featuredImage": null,
            "priceRangeV2": { "minVariantPrice": { "amount": "49.00", "currencyCode": "USD" } }
        }))
        .expect("deserialize");

        let product = convert_product(node);
        assert_eq!(product.handle, "linen-shirt");
        assert!(!product.available, "zero inventory is not available");
        assert_eq!(product.price.map(|m| m.amount).as_deref(), Some("49.00"));
        assert_eq!(product.image_url, None);
    }

    #[test]
    fn converts_orders_and_flattens_tracking() {
        let node: OrderNode = serde_json::from_value(json!({
            "id": "gid://shopify/Order/1",
            "name": "#1042",
            "createdAt": "2026-01-05T12:00:00Z",
            "note": null,
            "email": "a@b.com",
            "displayFulfillmentStatus": "FULFILLED",
            "displayFinancialStatus": "PAID",
            "totalPriceSet": { "shopMoney": { "amount": "19.99", "currencyCode": "USD" } },
            "fulfillments": [
                { "trackingInfo": [ { "company": "UPS", "number": "1Z999", "url": null } ] },
                { "trackingInfo": [] }
            ]
        }))
        .expect("deserialize");

        let order = convert_order(node);
        assert_eq!(order.name, "#1042");
        assert_eq!(order.tracking.len(), 1);
        assert_eq!(order.tracking[0].company.as_deref(), Some("UPS"));
    }

    #[test]
    fn policy_titles_cover_known_types() {
        assert_eq!(policy_title("REFUND_POLICY"), "Refund policy");
        assert_eq!(policy_title("SOMETHING_NEW"), "Store policy");
    }

    #[test]
    fn user_errors_become_non_retryable_failures() {
        let errors = vec![UserError {
            message: "Note is too long".to_owned(),
        }];
        let err = check_user_errors(&errors).expect_err("user error");
        assert!(!err.retryable);
        assert!(err.message.contains("Note is too long"));
    }
}
