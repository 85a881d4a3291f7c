//! Local order cache and tombstone set
//!
//! The cache survives restarts and network loss; it is the
//! order-of-record for checkouts the gateway never confirmed.
//! Identity is first-write-wins: an insert that collides with an
//! existing `id` or `order_number` is dropped, not overwritten.

use super::{LocalStore, ORDER_NUMBERS_TABLE, ORDERS_TABLE, STOCK_APPLIED_TABLE, TOMBSTONES_TABLE};
use crate::StoreEvent;
use crate::store::StoreResult;
use redb::{ReadableDatabase, ReadableTable};
use shared::order::Order;
use std::collections::HashSet;
use tracing::{debug, warn};

impl LocalStore {
    /// All cached orders, newest first.
    ///
    /// Undecodable entries are skipped, never surfaced as errors:
    /// corrupt persisted data degrades to an emptier list.
    pub fn orders(&self) -> StoreResult<Vec<Order>> {
        let read_txn = self.db().begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (key, value) = result?;
            match serde_json::from_slice::<Order>(value.value()) {
                Ok(order) => orders.push(order),
                Err(e) => {
                    warn!(order_id = %key.value(), error = %e, "skipping undecodable cached order");
                }
            }
        }

        orders.sort_by_key(|o| std::cmp::Reverse(o.created_at_or_now()));
        Ok(orders)
    }

    /// Cached orders still waiting for gateway confirmation, oldest
    /// first (flush order).
    pub fn pending_orders(&self) -> StoreResult<Vec<Order>> {
        let mut pending: Vec<Order> = self.orders()?.into_iter().filter(|o| o.pending).collect();
        pending.sort_by_key(Order::created_at_or_now);
        Ok(pending)
    }

    /// Normalize and insert an order unless its `id` or `order_number`
    /// is already present. Returns whether the insert happened.
    pub fn upsert_if_absent(&self, order: &Order) -> StoreResult<bool> {
        let mut order = order.clone();
        order.normalize();
        let json = serde_json::to_vec(&order)?;

        let txn = self.db().begin_write()?;
        let inserted = {
            let mut orders = txn.open_table(ORDERS_TABLE)?;
            let mut numbers = txn.open_table(ORDER_NUMBERS_TABLE)?;

            let id_taken = orders.get(order.id.as_str())?.is_some();
            let number_taken = !order.order_number.is_empty()
                && numbers.get(order.order_number.as_str())?.is_some();

            if id_taken || number_taken {
                false
            } else {
                orders.insert(order.id.as_str(), json.as_slice())?;
                if !order.order_number.is_empty() {
                    numbers.insert(order.order_number.as_str(), order.id.as_str())?;
                }
                true
            }
        };
        txn.commit()?;

        if inserted {
            debug!(order_id = %order.id, order_number = %order.order_number, "order cached");
            self.events().emit(StoreEvent::OrdersChanged);
        }
        Ok(inserted)
    }

    /// Remove every entry matching the identity (by `id` or
    /// `order_number`), then tombstone it so a stale remote copy
    /// cannot resurrect it. Idempotent.
    pub fn remove_by_identity(&self, identity: &str) -> StoreResult<()> {
        let txn = self.db().begin_write()?;
        {
            let mut orders = txn.open_table(ORDERS_TABLE)?;
            let mut numbers = txn.open_table(ORDER_NUMBERS_TABLE)?;
            let mut tombstones = txn.open_table(TOMBSTONES_TABLE)?;

            let mut ids: Vec<String> = Vec::new();
            if orders.get(identity)?.is_some() {
                ids.push(identity.to_string());
            }
            let mapped = numbers.get(identity)?.map(|g| g.value().to_string());
            if let Some(id) = mapped
                && !ids.contains(&id)
            {
                ids.push(id);
            }

            for id in &ids {
                let number = orders
                    .remove(id.as_str())?
                    .and_then(|g| serde_json::from_slice::<Order>(g.value()).ok())
                    .map(|o| o.order_number);
                if let Some(number) = number
                    && !number.is_empty()
                {
                    numbers.remove(number.as_str())?;
                }
            }

            tombstones.insert(identity, ())?;
        }
        txn.commit()?;

        debug!(identity = %identity, "order removed and tombstoned");
        self.events().emit(StoreEvent::OrdersChanged);
        Ok(())
    }

    /// Swap a pending record for its gateway-confirmed mirror in one
    /// transaction. The pending identity is NOT tombstoned (it was
    /// never deleted, it graduated), and any stock command applied
    /// under the pending id follows the order to its confirmed id.
    pub fn replace_pending(&self, pending_id: &str, confirmed: &Order) -> StoreResult<()> {
        let mut confirmed = confirmed.clone();
        confirmed.normalize();
        let json = serde_json::to_vec(&confirmed)?;

        let txn = self.db().begin_write()?;
        {
            let mut orders = txn.open_table(ORDERS_TABLE)?;
            let mut numbers = txn.open_table(ORDER_NUMBERS_TABLE)?;
            let mut applied = txn.open_table(STOCK_APPLIED_TABLE)?;

            let pending_number = orders
                .remove(pending_id)?
                .and_then(|g| serde_json::from_slice::<Order>(g.value()).ok())
                .map(|o| o.order_number);
            if let Some(number) = pending_number
                && !number.is_empty()
            {
                numbers.remove(number.as_str())?;
            }

            // First-write-wins still applies to the confirmed identity
            let id_taken = orders.get(confirmed.id.as_str())?.is_some();
            let number_taken = !confirmed.order_number.is_empty()
                && numbers.get(confirmed.order_number.as_str())?.is_some();
            if !id_taken && !number_taken {
                orders.insert(confirmed.id.as_str(), json.as_slice())?;
                if !confirmed.order_number.is_empty() {
                    numbers.insert(confirmed.order_number.as_str(), confirmed.id.as_str())?;
                }
            }

            if applied.remove(pending_id)?.is_some() {
                applied.insert(confirmed.id.as_str(), ())?;
            }
        }
        txn.commit()?;

        debug!(pending_id = %pending_id, confirmed_id = %confirmed.id, "pending order replaced");
        self.events().emit(StoreEvent::OrdersChanged);
        Ok(())
    }

    // ========== Tombstones ==========

    pub fn is_tombstoned(&self, identity: &str) -> StoreResult<bool> {
        let read_txn = self.db().begin_read()?;
        let table = read_txn.open_table(TOMBSTONES_TABLE)?;
        Ok(table.get(identity)?.is_some())
    }

    pub fn mark_tombstoned(&self, identity: &str) -> StoreResult<()> {
        let txn = self.db().begin_write()?;
        {
            let mut table = txn.open_table(TOMBSTONES_TABLE)?;
            table.insert(identity, ())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// The whole tombstone set, for the reconciler's merge
    pub fn tombstones(&self) -> StoreResult<HashSet<String>> {
        let read_txn = self.db().begin_read()?;
        let table = read_txn.open_table(TOMBSTONES_TABLE)?;

        let mut set = HashSet::new();
        for result in table.iter()? {
            let (key, _) = result?;
            set.insert(key.value().to_string());
        }
        Ok(set)
    }
}
