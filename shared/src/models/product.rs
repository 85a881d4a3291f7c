//! Product Model

use serde::{Deserialize, Serialize};

/// Product entity as mirrored from the gateway
///
/// `stock` is a legacy alias some gateway shapes still carry; it MUST
/// track `stock_quantity`. Mutate stock through [`Product::set_stock`]
/// so both fields stay equal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Price in whole CLP
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub stock_quantity: i64,
    /// Legacy alias, kept equal to `stock_quantity`
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub brand: String,
    /// The gateway calls the category field `type`
    #[serde(rename = "type", default)]
    pub product_type: String,
    #[serde(default)]
    pub series: String,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Product {
    /// Current stock, preferring `stock_quantity` but falling back to
    /// the legacy alias when only that one is populated.
    pub fn current_stock(&self) -> i64 {
        if self.stock_quantity != 0 {
            self.stock_quantity
        } else {
            self.stock
        }
    }

    /// Set both stock fields to the same value
    pub fn set_stock(&mut self, value: i64) {
        self.stock_quantity = value;
        self.stock = value;
    }
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: i64,
    pub stock_quantity: i64,
    #[serde(default)]
    pub brand: String,
    #[serde(rename = "type", default)]
    pub product_type: String,
    #[serde(default)]
    pub series: String,
    pub created_at: i64,
    pub is_active: bool,
}

/// Update product payload (PATCH semantics: `None` fields are omitted)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Product listing query (pagination and search)
#[derive(Debug, Clone, Serialize)]
pub struct ProductQuery {
    pub limit: i64,
    pub offset: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub q: String,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            limit: 12,
            offset: 0,
            q: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_stock_keeps_alias_equal() {
        let mut product: Product = serde_json::from_value(serde_json::json!({
            "id": "p1",
            "name": "Driger S",
            "stock": 7
        }))
        .unwrap();
        assert_eq!(product.current_stock(), 7);

        product.set_stock(3);
        assert_eq!(product.stock_quantity, 3);
        assert_eq!(product.stock, 3);
    }

    #[test]
    fn test_update_skips_absent_fields() {
        let update = ProductUpdate {
            price: Some(4990),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({ "price": 4990 }));
    }
}
