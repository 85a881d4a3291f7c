//! Shared types for the BeyStore client
//!
//! Domain models used across the gateway client and the local store:
//! orders, products, cart lines, status enums, and owner-identity
//! normalization helpers.

pub mod models;
pub mod order;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use models::{CartLine, Product, ProductCreate, ProductQuery, ProductUpdate};
pub use order::{
    Order, OrderCreate, OrderItem, OrderItemCreate, OrderStatus, OrderUpdate, PaymentStatus,
};
