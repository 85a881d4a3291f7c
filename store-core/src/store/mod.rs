//! redb-based local store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | order id | JSON `Order` | Local order cache |
//! | `order_numbers` | order number | order id | Identity uniqueness index |
//! | `tombstones` | identity | `()` | Deleted-order suppression |
//! | `products` | product id | JSON `Product` | Stock-mirrored catalog |
//! | `stock_applied` | order id | `()` | Idempotent stock commands |
//! | `cart` | `"cart"` | JSON `Vec<CartLine>` | Active cart |
//!
//! Every collection is written whole per entry inside one transaction;
//! redb's default `Durability::Immediate` keeps the file consistent
//! across crashes. Reads treat undecodable values as absent (the cache
//! degrades, it never errors on bad persisted data).

mod cart;
mod orders;
mod stock;

use crate::events::EventHub;
use redb::{Database, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

/// Local order cache: key = order id, value = JSON-serialized Order
pub(crate) const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Identity index: key = order number, value = owning order id
pub(crate) const ORDER_NUMBERS_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("order_numbers");

/// Tombstones: key = deleted identity (id or order number), value = empty
pub(crate) const TOMBSTONES_TABLE: TableDefinition<&str, ()> = TableDefinition::new("tombstones");

/// Mirrored products: key = product id, value = JSON-serialized Product
pub(crate) const PRODUCTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("products");

/// Applied stock commands: key = order id, value = empty (idempotency)
pub(crate) const STOCK_APPLIED_TABLE: TableDefinition<&str, ()> =
    TableDefinition::new("stock_applied");

/// Active cart: single key, value = JSON-serialized Vec<CartLine>
pub(crate) const CART_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("cart");

pub(crate) const CART_KEY: &str = "cart";

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable local store shared by all storefront components
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Database>,
    events: EventHub,
}

impl LocalStore {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests and demos)
    pub fn open_in_memory() -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StoreResult<Self> {
        // Create all tables up front so reads never race creation
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(ORDER_NUMBERS_TABLE)?;
            let _ = write_txn.open_table(TOMBSTONES_TABLE)?;
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(STOCK_APPLIED_TABLE)?;
            let _ = write_txn.open_table(CART_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            events: EventHub::new(),
        })
    }

    pub(crate) fn db(&self) -> &Database {
        &self.db
    }

    pub(crate) fn events(&self) -> &EventHub {
        &self.events
    }

    /// Subscribe to change notifications for this store
    pub fn subscribe(&self) -> broadcast::Receiver<crate::StoreEvent> {
        self.events.subscribe()
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("db", &"<redb::Database>")
            .finish()
    }
}
