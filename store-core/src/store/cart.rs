//! Cart persistence
//!
//! The cart is one JSON value under a fixed key; every mutation
//! rewrites the whole list. A malformed persisted cart reads back as
//! empty rather than erroring.

use super::{CART_KEY, CART_TABLE, LocalStore};
use crate::StoreEvent;
use crate::store::StoreResult;
use redb::{ReadableDatabase, ReadableTable};
use shared::models::{CartLine, Product};
use tracing::warn;

impl LocalStore {
    pub fn cart(&self) -> StoreResult<Vec<CartLine>> {
        let read_txn = self.db().begin_read()?;
        let table = read_txn.open_table(CART_TABLE)?;

        let Some(value) = table.get(CART_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_slice(value.value()) {
            Ok(lines) => Ok(lines),
            Err(e) => {
                warn!(error = %e, "malformed cart, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    /// Add one unit of a product, merging into an existing line.
    pub fn add_to_cart(&self, product: &Product) -> StoreResult<Vec<CartLine>> {
        let mut lines = self.cart()?;
        match lines.iter_mut().find(|l| l.product_id == product.id) {
            Some(line) => line.quantity += 1,
            None => lines.push(CartLine::from_product(product, 1)),
        }
        self.write_cart(&lines)?;
        Ok(lines)
    }

    /// Set a line's quantity; zero or below removes the line.
    pub fn set_cart_quantity(&self, product_id: &str, quantity: i64) -> StoreResult<Vec<CartLine>> {
        let mut lines = self.cart()?;
        if quantity <= 0 {
            lines.retain(|l| l.product_id != product_id);
        } else if let Some(line) = lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = quantity;
        }
        self.write_cart(&lines)?;
        Ok(lines)
    }

    pub fn remove_from_cart(&self, product_id: &str) -> StoreResult<Vec<CartLine>> {
        let mut lines = self.cart()?;
        lines.retain(|l| l.product_id != product_id);
        self.write_cart(&lines)?;
        Ok(lines)
    }

    pub fn clear_cart(&self) -> StoreResult<()> {
        self.write_cart(&[])
    }

    fn write_cart(&self, lines: &[CartLine]) -> StoreResult<()> {
        let json = serde_json::to_vec(lines)?;
        let txn = self.db().begin_write()?;
        {
            let mut table = txn.open_table(CART_TABLE)?;
            table.insert(CART_KEY, json.as_slice())?;
        }
        txn.commit()?;
        self.events().emit(StoreEvent::CartChanged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::cart_total;

    fn product(id: &str, price: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Beyblade {id}"),
            price,
            stock_quantity: 10,
            stock: 10,
            is_active: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_add_merges_quantities() {
        let store = LocalStore::open_in_memory().unwrap();
        store.add_to_cart(&product("p1", 1000)).unwrap();
        store.add_to_cart(&product("p2", 500)).unwrap();
        let lines = store.add_to_cart(&product("p1", 1000)).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(cart_total(&lines), 2500);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let store = LocalStore::open_in_memory().unwrap();
        store.add_to_cart(&product("p1", 1000)).unwrap();
        store.add_to_cart(&product("p2", 500)).unwrap();

        let lines = store.set_cart_quantity("p1", 5).unwrap();
        assert_eq!(lines[0].quantity, 5);

        let lines = store.set_cart_quantity("p1", 0).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_id, "p2");
    }

    #[test]
    fn test_corrupted_cart_reads_as_empty() {
        let store = LocalStore::open_in_memory().unwrap();
        store.add_to_cart(&product("p1", 1000)).unwrap();

        let txn = store.db().begin_write().unwrap();
        {
            let mut table = txn.open_table(CART_TABLE).unwrap();
            table.insert(CART_KEY, b"not json".as_slice()).unwrap();
        }
        txn.commit().unwrap();

        assert!(store.cart().unwrap().is_empty());
        // And the cart is writable again afterwards
        let lines = store.add_to_cart(&product("p2", 500)).unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_cart_survives_reopen_of_handle() {
        let store = LocalStore::open_in_memory().unwrap();
        store.add_to_cart(&product("p1", 1000)).unwrap();
        store.remove_from_cart("missing").unwrap();

        assert_eq!(store.cart().unwrap().len(), 1);
        store.clear_cart().unwrap();
        assert!(store.cart().unwrap().is_empty());
    }
}
