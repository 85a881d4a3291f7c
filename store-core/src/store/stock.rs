//! Product cache and stock ledger
//!
//! Stock moves in whole units per order line. Decrements clamp at
//! zero; restores do not clamp upward. The order-keyed variants are
//! idempotent: each order id applies its decrement (or restore) at
//! most once, tracked in the stock_applied table.

use super::{LocalStore, PRODUCTS_TABLE, STOCK_APPLIED_TABLE};
use crate::StoreEvent;
use crate::store::StoreResult;
use redb::{ReadableDatabase, ReadableTable};
use shared::models::Product;
use shared::order::OrderItem;
use tracing::{debug, warn};

impl LocalStore {
    /// All cached products, in key order.
    pub fn products(&self) -> StoreResult<Vec<Product>> {
        let read_txn = self.db().begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;

        let mut products = Vec::new();
        for result in table.iter()? {
            let (key, value) = result?;
            match serde_json::from_slice::<Product>(value.value()) {
                Ok(product) => products.push(product),
                Err(e) => {
                    warn!(product_id = %key.value(), error = %e, "skipping undecodable cached product");
                }
            }
        }
        Ok(products)
    }

    pub fn get_product(&self, id: &str) -> StoreResult<Option<Product>> {
        let read_txn = self.db().begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Replace the whole product cache with a fresh gateway listing.
    /// Both stock fields are synchronized on the way in.
    pub fn replace_products(&self, products: &[Product]) -> StoreResult<()> {
        let txn = self.db().begin_write()?;
        {
            let mut table = txn.open_table(PRODUCTS_TABLE)?;
            table.retain(|_, _| false)?;
            for product in products {
                let mut product = product.clone();
                product.set_stock(product.current_stock());
                let json = serde_json::to_vec(&product)?;
                table.insert(product.id.as_str(), json.as_slice())?;
            }
        }
        txn.commit()?;

        debug!(count = products.len(), "product cache replaced");
        self.events().emit(StoreEvent::StockChanged);
        Ok(())
    }

    /// Subtract each line's quantity from its product, clamping at
    /// zero. Lines for unknown products are skipped.
    pub fn decrement_stock(&self, items: &[OrderItem]) -> StoreResult<()> {
        self.adjust_stock(items, -1)
    }

    /// Add each line's quantity back. No upper clamp: a restore after
    /// an external stock change may overshoot, and that is preferred
    /// over losing units.
    pub fn restore_stock(&self, items: &[OrderItem]) -> StoreResult<()> {
        self.adjust_stock(items, 1)
    }

    /// Decrement keyed by order id: the first call for an id applies
    /// and records it, later calls are no-ops. Returns whether this
    /// call applied.
    pub fn decrement_for_order(&self, order_id: &str, items: &[OrderItem]) -> StoreResult<bool> {
        let already = {
            let read_txn = self.db().begin_read()?;
            let table = read_txn.open_table(STOCK_APPLIED_TABLE)?;
            table.get(order_id)?.is_some()
        };
        if already {
            debug!(order_id = %order_id, "stock already applied for order");
            return Ok(false);
        }

        self.adjust_stock(items, -1)?;

        let txn = self.db().begin_write()?;
        {
            let mut table = txn.open_table(STOCK_APPLIED_TABLE)?;
            table.insert(order_id, ())?;
        }
        txn.commit()?;
        Ok(true)
    }

    /// Inverse of [`decrement_for_order`](Self::decrement_for_order):
    /// restores and clears the marker if one exists, otherwise falls
    /// back to a plain restore (the order may predate command
    /// tracking).
    pub fn restore_for_order(&self, order_id: &str, items: &[OrderItem]) -> StoreResult<()> {
        let txn = self.db().begin_write()?;
        let had_marker = {
            let mut table = txn.open_table(STOCK_APPLIED_TABLE)?;
            table.remove(order_id)?.is_some()
        };
        txn.commit()?;

        if !had_marker {
            debug!(order_id = %order_id, "no stock marker for order, restoring anyway");
        }
        self.adjust_stock(items, 1)
    }

    fn adjust_stock(&self, items: &[OrderItem], sign: i64) -> StoreResult<()> {
        if items.is_empty() {
            return Ok(());
        }

        let txn = self.db().begin_write()?;
        {
            let mut table = txn.open_table(PRODUCTS_TABLE)?;
            for item in items {
                let current = table
                    .get(item.product_id.as_str())?
                    .and_then(|g| serde_json::from_slice::<Product>(g.value()).ok());
                let Some(mut product) = current else {
                    warn!(product_id = %item.product_id, "stock adjustment for unknown product skipped");
                    continue;
                };

                let delta = sign * item.quantity.max(0);
                let next = (product.current_stock() + delta).max(0);
                product.set_stock(next);
                let json = serde_json::to_vec(&product)?;
                table.insert(product.id.as_str(), json.as_slice())?;
            }
        }
        txn.commit()?;

        self.events().emit(StoreEvent::StockChanged);
        Ok(())
    }
}
