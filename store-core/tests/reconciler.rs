//! Reconciler integration tests against a scripted in-memory gateway

use async_trait::async_trait;
use shared::models::{Product, ProductCreate, ProductQuery, ProductUpdate};
use shared::order::{
    Order, OrderCreate, OrderItem, OrderItemCreate, OrderStatus, OrderUpdate, PaymentStatus,
};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use store_client::{ClientError, ClientResult, StoreGateway};
use store_core::{LocalStore, Reconciler};

/// Gateway double: records every call, can be switched into a failure
/// mode that refuses order writes.
#[derive(Default)]
struct MockGateway {
    refuse_orders: AtomicBool,
    next_id: AtomicI64,
    remote_orders: Mutex<Vec<Order>>,
    created: Mutex<Vec<OrderCreate>>,
    item_rows: Mutex<Vec<OrderItemCreate>>,
    deleted: Mutex<Vec<String>>,
    updates: Mutex<Vec<(String, Option<OrderStatus>, Option<PaymentStatus>)>>,
}

impl MockGateway {
    fn new() -> Self {
        let gateway = Self::default();
        gateway.next_id.store(42, Ordering::SeqCst);
        gateway
    }

    fn refuse(&self, refuse: bool) {
        self.refuse_orders.store(refuse, Ordering::SeqCst);
    }

    fn unreachable() -> ClientError {
        ClientError::Api {
            status: 503,
            body: "backend unavailable".to_string(),
        }
    }
}

#[async_trait]
impl StoreGateway for MockGateway {
    async fn list_orders(&self, _token: Option<&str>) -> ClientResult<Vec<Order>> {
        if self.refuse_orders.load(Ordering::SeqCst) {
            return Err(Self::unreachable());
        }
        Ok(self.remote_orders.lock().unwrap().clone())
    }

    async fn create_order(
        &self,
        _token: Option<&str>,
        payload: &OrderCreate,
    ) -> ClientResult<Order> {
        if self.refuse_orders.load(Ordering::SeqCst) {
            return Err(Self::unreachable());
        }
        self.created.lock().unwrap().push(payload.clone());
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        // Echo back the bare record shape the backend produces: id
        // only, no items, no order number.
        Ok(Order {
            id: id.to_string(),
            ..Default::default()
        })
    }

    async fn create_order_item(
        &self,
        _token: Option<&str>,
        item: &OrderItemCreate,
    ) -> ClientResult<OrderItem> {
        if self.refuse_orders.load(Ordering::SeqCst) {
            return Err(Self::unreachable());
        }
        self.item_rows.lock().unwrap().push(item.clone());
        Ok(item.clone().into_item())
    }

    async fn update_order(
        &self,
        _token: Option<&str>,
        id: &str,
        update: &OrderUpdate,
    ) -> ClientResult<()> {
        self.updates
            .lock()
            .unwrap()
            .push((id.to_string(), update.status, update.payment_status));
        Ok(())
    }

    async fn delete_order(&self, _token: Option<&str>, id: &str) -> ClientResult<()> {
        if self.refuse_orders.load(Ordering::SeqCst) {
            return Err(Self::unreachable());
        }
        self.deleted.lock().unwrap().push(id.to_string());
        self.remote_orders.lock().unwrap().retain(|o| o.id != id);
        Ok(())
    }

    async fn list_order_items(&self, _token: Option<&str>) -> ClientResult<Vec<OrderItemCreate>> {
        Ok(self.item_rows.lock().unwrap().clone())
    }

    async fn list_products(
        &self,
        _token: Option<&str>,
        _query: &ProductQuery,
    ) -> ClientResult<Vec<Product>> {
        Ok(Vec::new())
    }

    async fn get_product(&self, _token: Option<&str>, id: &str) -> ClientResult<Product> {
        Err(ClientError::NotFound(format!("product/{id}")))
    }

    async fn create_product(
        &self,
        _token: Option<&str>,
        _payload: &ProductCreate,
    ) -> ClientResult<Product> {
        Err(ClientError::Forbidden("admin only".to_string()))
    }

    async fn update_product(
        &self,
        _token: Option<&str>,
        _id: &str,
        _update: &ProductUpdate,
    ) -> ClientResult<Product> {
        Err(ClientError::Forbidden("admin only".to_string()))
    }

    async fn delete_product(&self, _token: Option<&str>, _id: &str) -> ClientResult<()> {
        Err(ClientError::Forbidden("admin only".to_string()))
    }
}

fn product(id: &str, price: i64, stock: i64) -> Product {
    Product {
        id: id.to_string(),
        name: format!("Beyblade {id}"),
        price,
        stock_quantity: stock,
        stock,
        is_active: true,
        ..Default::default()
    }
}

fn rig() -> (std::sync::Arc<MockGateway>, Reconciler) {
    let gateway = std::sync::Arc::new(MockGateway::new());
    let store = LocalStore::open_in_memory().unwrap();
    let reconciler = Reconciler::new(gateway.clone(), store);
    (gateway, reconciler)
}

fn fill_cart(reconciler: &Reconciler) {
    let store = reconciler.store();
    store.replace_products(&[product("p1", 1000, 5)]).unwrap();
    store.add_to_cart(&product("p1", 1000, 5)).unwrap();
    store.add_to_cart(&product("p1", 1000, 5)).unwrap();
}

#[tokio::test]
async fn test_checkout_offline_keeps_pending_and_applies_side_effects() {
    let (gateway, reconciler) = rig();
    fill_cart(&reconciler);
    gateway.refuse(true);

    let order = reconciler
        .checkout(None, "tyson@example.com", "Tyson", None)
        .await
        .unwrap();

    assert!(order.pending);
    assert!(order.id.starts_with("pending-"));
    assert!(order.order_number.starts_with('#'));
    assert_eq!(order.total_amount, 2000);

    let store = reconciler.store();
    assert_eq!(store.pending_orders().unwrap().len(), 1);
    assert!(store.cart().unwrap().is_empty());
    assert_eq!(store.get_product("p1").unwrap().unwrap().current_stock(), 3);
}

#[tokio::test]
async fn test_checkout_online_replaces_pending_with_confirmed() {
    let (gateway, reconciler) = rig();
    fill_cart(&reconciler);

    let order = reconciler
        .checkout(None, "tyson@example.com", "Tyson", Some("webpay".to_string()))
        .await
        .unwrap();

    assert!(!order.pending);
    assert!(order.remote);
    assert_eq!(order.id, "42");
    // Blank gateway echo fields backfilled from the local record
    assert_eq!(order.total_amount, 2000);
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.owner_identity(), Some("tyson@example.com"));

    let store = reconciler.store();
    assert!(store.pending_orders().unwrap().is_empty());
    assert_eq!(store.orders().unwrap().len(), 1);
    assert!(store.cart().unwrap().is_empty());
    assert_eq!(store.get_product("p1").unwrap().unwrap().current_stock(), 3);

    let rows = gateway.item_rows.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].order_id, "42");
    assert_eq!(rows[0].quantity, 2);

    let created = gateway.created.lock().unwrap();
    assert_eq!(created[0].user_email, "tyson@example.com");
    assert_eq!(created[0].payment_method.as_deref(), Some("webpay"));
}

#[tokio::test]
async fn test_flush_pending_confirms_without_double_decrement() {
    let (gateway, reconciler) = rig();
    fill_cart(&reconciler);
    gateway.refuse(true);

    reconciler
        .checkout(None, "tyson@example.com", "Tyson", None)
        .await
        .unwrap();

    gateway.refuse(false);
    assert_eq!(reconciler.flush_pending(None).await.unwrap(), 1);

    let store = reconciler.store();
    assert!(store.pending_orders().unwrap().is_empty());
    let orders = store.orders().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, "42");
    assert!(orders[0].remote);
    // Stock was applied at checkout time, not again at flush
    assert_eq!(store.get_product("p1").unwrap().unwrap().current_stock(), 3);

    // Nothing left to flush
    assert_eq!(reconciler.flush_pending(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_cancel_restores_stock_and_tombstones() {
    let (gateway, reconciler) = rig();
    fill_cart(&reconciler);

    let order = reconciler
        .checkout(None, "tyson@example.com", "Tyson", None)
        .await
        .unwrap();
    reconciler.cancel_order(None, &order).await.unwrap();

    let store = reconciler.store();
    assert!(store.orders().unwrap().is_empty());
    assert!(store.is_tombstoned("42").unwrap());
    assert_eq!(store.get_product("p1").unwrap().unwrap().current_stock(), 5);
    assert_eq!(gateway.deleted.lock().unwrap().as_slice(), ["42"]);
}

#[tokio::test]
async fn test_cancel_pending_order_skips_remote_delete() {
    let (gateway, reconciler) = rig();
    fill_cart(&reconciler);
    gateway.refuse(true);

    let order = reconciler
        .checkout(None, "tyson@example.com", "Tyson", None)
        .await
        .unwrap();
    reconciler.cancel_order(None, &order).await.unwrap();

    let store = reconciler.store();
    assert!(store.orders().unwrap().is_empty());
    assert_eq!(store.get_product("p1").unwrap().unwrap().current_stock(), 5);
    assert!(gateway.deleted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_load_orders_merges_and_honors_tombstones() {
    let (gateway, reconciler) = rig();

    gateway.remote_orders.lock().unwrap().extend([
        Order {
            id: "1".to_string(),
            order_number: "#100".to_string(),
            created_at: Some(10),
            user_email: Some("a@x.com".to_string()),
            ..Default::default()
        },
        Order {
            id: "2".to_string(),
            order_number: "#200".to_string(),
            created_at: Some(20),
            user_email: Some("a@x.com".to_string()),
            ..Default::default()
        },
    ]);

    let store = reconciler.store();
    store
        .upsert_if_absent(&Order {
            id: "pending-1".to_string(),
            order_number: "#300".to_string(),
            created_at: Some(30),
            pending: true,
            ..Default::default()
        })
        .unwrap();
    store.remove_by_identity("1").unwrap();

    let merged = reconciler.load_orders(None).await.unwrap();
    let ids: Vec<&str> = merged.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["pending-1", "2"]);
}

#[tokio::test]
async fn test_set_status_confirmed_marks_paid() {
    let (gateway, reconciler) = rig();

    reconciler
        .set_status(Some("admin-token"), "42", OrderStatus::Confirmed)
        .await
        .unwrap();
    reconciler
        .set_status(Some("admin-token"), "43", OrderStatus::Rejected)
        .await
        .unwrap();

    let updates = gateway.updates.lock().unwrap();
    assert_eq!(
        updates[0],
        (
            "42".to_string(),
            Some(OrderStatus::Confirmed),
            Some(PaymentStatus::Paid)
        )
    );
    assert_eq!(updates[1], ("43".to_string(), Some(OrderStatus::Rejected), None));
}
