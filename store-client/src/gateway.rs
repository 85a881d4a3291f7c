//! Remote Store Gateway
//!
//! Typed surface over the hosted backend's REST endpoints. The
//! [`StoreGateway`] trait is the seam the reconciler consumes; the
//! [`HttpGateway`] implementation talks to the real backend and
//! tolerates the several response envelopes it is known to produce.

use crate::{ClientConfig, ClientResult, HttpClient};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use shared::order::{Order, OrderCreate, OrderItem, OrderItemCreate, OrderUpdate};
use shared::{Product, ProductCreate, ProductQuery, ProductUpdate};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Request/response contract of the hosted store backend
#[async_trait]
pub trait StoreGateway: Send + Sync {
    /// List orders. The list endpoint may omit line items.
    async fn list_orders(&self, token: Option<&str>) -> ClientResult<Vec<Order>>;

    /// Create an order. The response carries at least an id.
    async fn create_order(&self, token: Option<&str>, payload: &OrderCreate) -> ClientResult<Order>;

    /// Persist one line item. Called once per item; a single failure
    /// must not abort the batch (the caller skips and logs it).
    async fn create_order_item(
        &self,
        token: Option<&str>,
        item: &OrderItemCreate,
    ) -> ClientResult<OrderItem>;

    async fn update_order(
        &self,
        token: Option<&str>,
        id: &str,
        update: &OrderUpdate,
    ) -> ClientResult<()>;

    async fn delete_order(&self, token: Option<&str>, id: &str) -> ClientResult<()>;

    /// Whole `order_item` table; the backend does not filter by order
    /// server-side, so grouping happens in memory.
    async fn list_order_items(&self, token: Option<&str>) -> ClientResult<Vec<OrderItemCreate>>;

    async fn list_products(
        &self,
        token: Option<&str>,
        query: &ProductQuery,
    ) -> ClientResult<Vec<Product>>;

    async fn get_product(&self, token: Option<&str>, id: &str) -> ClientResult<Product>;

    async fn create_product(
        &self,
        token: Option<&str>,
        payload: &ProductCreate,
    ) -> ClientResult<Product>;

    async fn update_product(
        &self,
        token: Option<&str>,
        id: &str,
        update: &ProductUpdate,
    ) -> ClientResult<Product>;

    async fn delete_product(&self, token: Option<&str>, id: &str) -> ClientResult<()>;

    /// List orders and enrich each itemless one from the `order_item`
    /// table. Item loading is best effort: on failure the orders are
    /// returned without enrichment.
    async fn list_orders_with_items(&self, token: Option<&str>) -> ClientResult<Vec<Order>> {
        let mut orders = self.list_orders(token).await?;

        let mut by_order: HashMap<String, Vec<OrderItem>> = HashMap::new();
        match self.list_order_items(token).await {
            Ok(rows) => {
                for row in rows {
                    if row.order_id.is_empty() {
                        continue;
                    }
                    by_order
                        .entry(row.order_id.clone())
                        .or_default()
                        .push(row.into_item());
                }
            }
            Err(e) => warn!(error = %e, "could not load order items, returning orders bare"),
        }

        for order in &mut orders {
            if order.items.is_empty()
                && let Some(items) = by_order.remove(&order.id)
            {
                debug!(order_id = %order.id, items = items.len(), "order enriched from order_item table");
                order.items = items;
            }
        }
        Ok(orders)
    }
}

/// The gateway speaks several list envelopes depending on endpoint
/// and version: a bare array, `{items: [...]}`, `{data: [...]}`, or a
/// single object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListEnvelope<T> {
    Plain(Vec<T>),
    Items { items: Vec<T> },
    Data { data: Vec<T> },
    One(T),
}

impl<T> ListEnvelope<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Plain(v) | Self::Items { items: v } | Self::Data { data: v } => v,
            Self::One(item) => vec![item],
        }
    }
}

/// Successful login response
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    #[serde(rename = "authToken")]
    pub auth_token: String,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

/// Profile returned by the `me` endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// The backend has returned both `true` and `1` here
    #[serde(default, deserialize_with = "de_bool_like")]
    pub is_admin: bool,
}

fn de_bool_like<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    })
}

#[derive(serde::Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(serde::Serialize)]
struct SignupRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

/// HTTP implementation of the gateway contract
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: HttpClient,
    config: ClientConfig,
}

impl HttpGateway {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = HttpClient::new(config.timeout)?;
        Ok(Self { http, config })
    }

    /// Default token from configuration, for callers that do not
    /// manage sessions themselves.
    pub fn token(&self) -> Option<&str> {
        self.config.token.as_deref()
    }

    // ========== Auth (delegated entirely to the backend) ==========

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<AuthSession> {
        self.http
            .post(
                &self.config.auth_base,
                "login",
                None,
                &LoginRequest { email, password },
            )
            .await
    }

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> ClientResult<AuthSession> {
        self.http
            .post(
                &self.config.auth_base,
                "signup",
                None,
                &SignupRequest { name, email, password },
            )
            .await
    }

    pub async fn me(&self, token: &str) -> ClientResult<UserProfile> {
        self.http
            .get(&self.config.auth_base, "me", Some(token), &[])
            .await
    }
}

#[async_trait]
impl StoreGateway for HttpGateway {
    async fn list_orders(&self, token: Option<&str>) -> ClientResult<Vec<Order>> {
        let envelope: ListEnvelope<Order> = self
            .http
            .get(&self.config.store_base, "order", token, &[])
            .await?;
        Ok(envelope.into_vec())
    }

    async fn create_order(&self, token: Option<&str>, payload: &OrderCreate) -> ClientResult<Order> {
        self.http
            .post(&self.config.store_base, "order", token, payload)
            .await
    }

    async fn create_order_item(
        &self,
        token: Option<&str>,
        item: &OrderItemCreate,
    ) -> ClientResult<OrderItem> {
        self.http
            .post(&self.config.store_base, "order_item", token, item)
            .await
    }

    async fn update_order(
        &self,
        token: Option<&str>,
        id: &str,
        update: &OrderUpdate,
    ) -> ClientResult<()> {
        // The backend echoes the patched record; discard it.
        let _: Value = self
            .http
            .patch(&self.config.store_base, &format!("order/{id}"), token, update)
            .await?;
        Ok(())
    }

    async fn delete_order(&self, token: Option<&str>, id: &str) -> ClientResult<()> {
        let _: Value = self
            .http
            .delete(&self.config.store_base, &format!("order/{id}"), token)
            .await?;
        Ok(())
    }

    async fn list_order_items(&self, token: Option<&str>) -> ClientResult<Vec<OrderItemCreate>> {
        let envelope: ListEnvelope<OrderItemCreate> = self
            .http
            .get(&self.config.store_base, "order_item", token, &[])
            .await?;
        Ok(envelope.into_vec())
    }

    async fn list_products(
        &self,
        token: Option<&str>,
        query: &ProductQuery,
    ) -> ClientResult<Vec<Product>> {
        let mut params = vec![
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
        ];
        if !query.q.is_empty() {
            params.push(("q", query.q.clone()));
        }

        let result: ClientResult<ListEnvelope<Product>> = self
            .http
            .get(&self.config.store_base, "product", token, &params)
            .await;

        match result {
            Ok(envelope) => Ok(envelope.into_vec()),
            // The catalog is publicly readable; a stale token must not
            // blank the storefront, so retry unauthenticated.
            Err(e) if e.is_auth_failure() && token.is_some() => {
                warn!(error = %e, "product listing auth failed, retrying without token");
                let envelope: ListEnvelope<Product> = self
                    .http
                    .get(&self.config.store_base, "product", None, &params)
                    .await?;
                Ok(envelope.into_vec())
            }
            Err(e) => Err(e),
        }
    }

    async fn get_product(&self, token: Option<&str>, id: &str) -> ClientResult<Product> {
        self.http
            .get(&self.config.store_base, &format!("product/{id}"), token, &[])
            .await
    }

    async fn create_product(
        &self,
        token: Option<&str>,
        payload: &ProductCreate,
    ) -> ClientResult<Product> {
        self.http
            .post(&self.config.store_base, "product", token, payload)
            .await
    }

    async fn update_product(
        &self,
        token: Option<&str>,
        id: &str,
        update: &ProductUpdate,
    ) -> ClientResult<Product> {
        self.http
            .patch(&self.config.store_base, &format!("product/{id}"), token, update)
            .await
    }

    async fn delete_product(&self, token: Option<&str>, id: &str) -> ClientResult<()> {
        let _: Value = self
            .http
            .delete(&self.config.store_base, &format!("product/{id}"), token)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_accepts_all_known_shapes() {
        let plain: ListEnvelope<i64> = serde_json::from_str("[1,2]").unwrap();
        assert_eq!(plain.into_vec(), vec![1, 2]);

        let items: ListEnvelope<i64> = serde_json::from_str(r#"{"items":[3]}"#).unwrap();
        assert_eq!(items.into_vec(), vec![3]);

        let data: ListEnvelope<i64> = serde_json::from_str(r#"{"data":[4]}"#).unwrap();
        assert_eq!(data.into_vec(), vec![4]);

        let one: ListEnvelope<i64> = serde_json::from_str("5").unwrap();
        assert_eq!(one.into_vec(), vec![5]);
    }

    #[test]
    fn test_profile_admin_flag_tolerates_number() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"email":"a@x.com","is_admin":1}"#).unwrap();
        assert!(profile.is_admin);

        let profile: UserProfile =
            serde_json::from_str(r#"{"email":"a@x.com","is_admin":false}"#).unwrap();
        assert!(!profile.is_admin);
    }
}
