//! Domain models

pub mod cart;
pub mod product;

pub use cart::{CartLine, cart_total};
pub use product::{Product, ProductCreate, ProductQuery, ProductUpdate};
