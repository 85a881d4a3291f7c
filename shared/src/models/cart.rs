//! Cart line model

use super::Product;
use crate::order::OrderItem;
use serde::{Deserialize, Serialize};

/// One line of the active cart: a product snapshot plus quantity.
///
/// Price and name are captured when the line is added; later catalog
/// edits do not retroactively change a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub product_name: String,
    /// Unit price in whole CLP, captured at add time
    pub unit_price: i64,
    pub quantity: i64,
}

impl CartLine {
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        Self {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            unit_price: product.price,
            quantity,
        }
    }

    pub fn subtotal(&self) -> i64 {
        self.unit_price * self.quantity
    }
}

impl From<&CartLine> for OrderItem {
    fn from(line: &CartLine) -> Self {
        OrderItem {
            product_id: line.product_id.clone(),
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
        }
    }
}

/// Sum of `unit_price * quantity` over all lines
pub fn cart_total(lines: &[CartLine]) -> i64 {
    lines.iter().map(CartLine::subtotal).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, price: i64, qty: i64) -> CartLine {
        CartLine {
            product_id: id.to_string(),
            product_name: format!("Producto #{id}"),
            unit_price: price,
            quantity: qty,
        }
    }

    #[test]
    fn test_cart_total() {
        assert_eq!(cart_total(&[]), 0);
        assert_eq!(cart_total(&[line("p1", 1000, 2), line("p2", 500, 3)]), 3500);
    }
}
