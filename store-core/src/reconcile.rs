//! Order reconciliation between the local cache and the gateway
//!
//! The reconciler owns the offline-first order lifecycle: checkouts
//! are written locally before the gateway is asked, gateway failures
//! leave a pending record behind instead of failing the sale, and
//! [`merge`] folds a remote listing and the local cache into one view
//! without duplicates or resurrected deletions.

use crate::ownership::{OwnerPolicy, visible_to};
use crate::store::{LocalStore, StoreError};
use shared::models::{CartLine, ProductQuery, cart_total};
use shared::order::{
    Order, OrderCreate, OrderItemCreate, OrderStatus, OrderUpdate, OwnerRef, PaymentStatus,
};
use shared::util;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use store_client::{ClientError, StoreGateway};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("local store error: {0}")]
    Store(#[from] StoreError),
    #[error("gateway error: {0}")]
    Gateway(#[from] ClientError),
    #[error("cannot check out an empty cart")]
    EmptyCart,
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Fold a remote listing and the local cache into one duplicate-free
/// view, newest first.
///
/// - Tombstoned identities (by `id` or `order_number`) are dropped
///   from both sides.
/// - A local order whose `id` or `order_number` already appears
///   remotely is superseded by the remote copy.
/// - Itemless remote orders borrow line items from their superseded
///   local counterpart.
pub fn merge(remote: &[Order], local: &[Order], tombstones: &HashSet<String>) -> Vec<Order> {
    let buried = |o: &Order| {
        tombstones.contains(&o.id)
            || (!o.order_number.is_empty() && tombstones.contains(&o.order_number))
    };

    let mut remote: Vec<Order> = remote.iter().filter(|o| !buried(o)).cloned().collect();
    let local: Vec<&Order> = local.iter().filter(|o| !buried(o)).collect();

    let mut remote_ids: HashSet<&str> = HashSet::new();
    let mut remote_numbers: HashSet<&str> = HashSet::new();
    for o in &remote {
        remote_ids.insert(o.id.as_str());
        if !o.order_number.is_empty() {
            remote_numbers.insert(o.order_number.as_str());
        }
    }

    let mut local_items: HashMap<&str, &Order> = HashMap::new();
    let mut to_add: Vec<Order> = Vec::new();
    for o in local {
        let superseded = remote_ids.contains(o.id.as_str())
            || (!o.order_number.is_empty() && remote_numbers.contains(o.order_number.as_str()));
        if superseded {
            if !o.items.is_empty() {
                local_items.insert(o.id.as_str(), o);
                if !o.order_number.is_empty() {
                    local_items.insert(o.order_number.as_str(), o);
                }
            }
        } else {
            to_add.push((*o).clone());
        }
    }

    for order in &mut remote {
        if order.items.is_empty() {
            let counterpart = local_items
                .get(order.id.as_str())
                .or_else(|| local_items.get(order.order_number.as_str()));
            if let Some(counterpart) = counterpart {
                debug!(order_id = %order.id, "remote order enriched from local cache");
                order.items = counterpart.items.clone();
            }
        }
    }

    let mut merged = to_add;
    merged.append(&mut remote);
    merged.sort_by_key(|o| std::cmp::Reverse(o.created_at_or_now()));
    merged
}

/// Drives the local store against a gateway.
#[derive(Clone)]
pub struct Reconciler {
    gateway: Arc<dyn StoreGateway>,
    store: LocalStore,
    policy: OwnerPolicy,
}

impl Reconciler {
    pub fn new(gateway: Arc<dyn StoreGateway>, store: LocalStore) -> Self {
        Self {
            gateway,
            store,
            policy: OwnerPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: OwnerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Merged order view: remote listing (item-enriched) folded with
    /// the local cache. Gateway errors propagate; callers that want an
    /// offline view read the cache directly.
    pub async fn load_orders(&self, token: Option<&str>) -> ReconcileResult<Vec<Order>> {
        let remote = self.gateway.list_orders_with_items(token).await?;
        let local = self.store.orders()?;
        let tombstones = self.store.tombstones()?;
        Ok(merge(&remote, &local, &tombstones))
    }

    /// [`load_orders`](Self::load_orders) narrowed to one customer.
    pub async fn load_orders_for(
        &self,
        token: Option<&str>,
        actor_email: &str,
        is_admin: bool,
    ) -> ReconcileResult<Vec<Order>> {
        let merged = self.load_orders(token).await?;
        Ok(visible_to(&merged, actor_email, is_admin, self.policy))
    }

    /// Refresh the product cache from the gateway.
    pub async fn refresh_products(
        &self,
        token: Option<&str>,
        query: &ProductQuery,
    ) -> ReconcileResult<Vec<shared::Product>> {
        let products = self.gateway.list_products(token, query).await?;
        self.store.replace_products(&products)?;
        Ok(products)
    }

    /// Check out the persisted cart.
    ///
    /// A pending record is cached before the gateway is asked. On
    /// gateway success the pending record is swapped for the confirmed
    /// mirror; on gateway failure the pending record stays for a later
    /// [`flush_pending`](Self::flush_pending). Either way stock is
    /// decremented exactly once and the cart is cleared: the sale
    /// never fails on network trouble.
    pub async fn checkout(
        &self,
        token: Option<&str>,
        owner_email: &str,
        display_name: &str,
        payment_method: Option<String>,
    ) -> ReconcileResult<Order> {
        let lines = self.store.cart()?;
        if lines.is_empty() {
            return Err(ReconcileError::EmptyCart);
        }

        let pending = pending_order(&lines, owner_email, display_name, payment_method);
        self.store.upsert_if_absent(&pending)?;

        match self.push_order(token, &pending).await {
            Ok(confirmed) => {
                self.store.replace_pending(&pending.id, &confirmed)?;
                self.store
                    .decrement_for_order(&confirmed.id, &confirmed.items)?;
                self.store.clear_cart()?;
                info!(order_id = %confirmed.id, order_number = %confirmed.order_number, "checkout confirmed");
                Ok(confirmed)
            }
            Err(e) => {
                warn!(error = %e, order_id = %pending.id, "checkout offline, order kept pending");
                self.store.decrement_for_order(&pending.id, &pending.items)?;
                self.store.clear_cart()?;
                Ok(pending)
            }
        }
    }

    /// Retry every cached pending order against the gateway, oldest
    /// first. Returns how many were confirmed; failures stay pending.
    pub async fn flush_pending(&self, token: Option<&str>) -> ReconcileResult<usize> {
        let pending = self.store.pending_orders()?;
        let mut flushed = 0;

        for order in pending {
            match self.push_order(token, &order).await {
                Ok(confirmed) => {
                    self.store.replace_pending(&order.id, &confirmed)?;
                    info!(pending_id = %order.id, confirmed_id = %confirmed.id, "pending order flushed");
                    flushed += 1;
                }
                Err(e) => {
                    warn!(error = %e, order_id = %order.id, "pending order still unreachable");
                }
            }
        }
        Ok(flushed)
    }

    /// Cancel an order: put its stock back, best-effort delete it
    /// remotely, then remove and tombstone it locally.
    pub async fn cancel_order(&self, token: Option<&str>, order: &Order) -> ReconcileResult<()> {
        if !order.items.is_empty() {
            self.store.restore_for_order(&order.id, &order.items)?;
        }

        if !order.pending
            && let Err(e) = self.gateway.delete_order(token, &order.id).await
        {
            warn!(error = %e, order_id = %order.id, "remote delete failed, removing locally anyway");
        }

        self.store.remove_by_identity(&order.id)?;
        Ok(())
    }

    /// Set an order's status on the gateway. Confirming also marks it
    /// paid.
    pub async fn set_status(
        &self,
        token: Option<&str>,
        order_id: &str,
        status: OrderStatus,
    ) -> ReconcileResult<()> {
        let update = OrderUpdate {
            status: Some(status),
            payment_status: (status == OrderStatus::Confirmed).then_some(PaymentStatus::Paid),
        };
        self.gateway.update_order(token, order_id, &update).await?;
        Ok(())
    }

    /// Create the order remotely and return its confirmed local
    /// mirror. Line items are pushed one by one; a failed item is
    /// logged and skipped, never fatal.
    async fn push_order(&self, token: Option<&str>, order: &Order) -> Result<Order, ClientError> {
        let payload = OrderCreate {
            user_email: order.owner_identity().unwrap_or_default().to_string(),
            display_name: order
                .display_name
                .clone()
                .unwrap_or_else(|| shared::order::FALLBACK_DISPLAY_NAME.to_string()),
            total_amount: order.total_amount,
            items: order.items.clone(),
            status: order.status,
            payment_status: order.payment_status,
            payment_method: order.payment_method.clone(),
        };
        let remote = self.gateway.create_order(token, &payload).await?;

        for item in &order.items {
            let row = OrderItemCreate {
                order_id: remote.id.clone(),
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                product_name: item.product_name.clone(),
            };
            if let Err(e) = self.gateway.create_order_item(token, &row).await {
                warn!(error = %e, product_id = %item.product_id, "order item not persisted remotely, skipping");
            }
        }

        Ok(confirmed_mirror(order, remote))
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("store", &self.store)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Provisional local order for a cart snapshot
fn pending_order(
    lines: &[CartLine],
    owner_email: &str,
    display_name: &str,
    payment_method: Option<String>,
) -> Order {
    let items = lines.iter().map(Into::into).collect();
    let mut order = Order {
        id: format!("pending-{}", util::now_millis()),
        order_number: util::order_number(),
        created_at: Some(util::now_secs()),
        total_amount: cart_total(lines),
        status: OrderStatus::Pending,
        payment_status: PaymentStatus::Pending,
        payment_method,
        user_email: Some(owner_email.to_string()),
        display_name: Some(display_name.to_string()),
        items,
        pending: true,
        ..Default::default()
    };
    order.normalize();
    order
}

/// Local mirror of a gateway-confirmed order. Fields the gateway
/// echoed back blank are kept from the source order.
fn confirmed_mirror(source: &Order, remote: Order) -> Order {
    let mut mirror = remote;
    if mirror.id.is_empty() {
        mirror.id = format!("remote-{}", util::now_millis());
    }
    if mirror.order_number.is_empty() {
        mirror.order_number = source.order_number.clone();
    }
    if mirror.created_at.is_none() {
        mirror.created_at = source.created_at;
    }
    if mirror.total_amount == 0 {
        mirror.total_amount = source.total_amount;
    }
    if mirror.items.is_empty() {
        mirror.items = source.items.clone();
    }
    if mirror.owner_identity().is_none() {
        mirror.user_email = source.user_email.clone();
        mirror.user = source.owner_identity().map(|e| OwnerRef::Email(e.to_string()));
    }
    if mirror.display_name.is_none() {
        mirror.display_name = source.display_name.clone();
    }
    mirror.pending = false;
    mirror.remote = true;
    mirror.normalize();
    mirror
}
