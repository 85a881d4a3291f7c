//! Order model and owner-identity normalization
//!
//! The gateway has gone through several payload shapes, so an order
//! carries its owner email under up to four alias fields (`user_email`,
//! `email`, `customer_email`, `user`) plus nested `user.email` /
//! `customer.email` forms. Writes normalize all aliases to the same
//! value; reads tolerate any subset being populated.

mod status;

pub use status::{OrderStatus, PaymentStatus, UnknownStatus};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Fallback display name when none was captured at checkout
pub const FALLBACK_DISPLAY_NAME: &str = "Usuario";

/// A checkout transaction, local or gateway-confirmed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Order {
    /// Gateway id, or a synthesized `pending-<millis>` for local orders
    #[serde(default, deserialize_with = "de_string_like")]
    pub id: String,
    /// Human-facing short code, e.g. `#483920`
    #[serde(default, deserialize_with = "de_string_like")]
    pub order_number: String,
    /// Epoch seconds; tolerates numeric strings and floats from old data
    #[serde(default, deserialize_with = "de_epoch")]
    pub created_at: Option<i64>,
    /// Sum of `unit_price * quantity` at checkout time, never recomputed
    #[serde(default)]
    pub total_amount: i64,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,

    // Owner aliases. All populated fields must agree after normalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<OwnerRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<AccountRef>,

    #[serde(
        default,
        alias = "displayName",
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,

    /// Provisional local-only record, not yet gateway-confirmed
    #[serde(rename = "_pending", default, skip_serializing_if = "is_false")]
    pub pending: bool,
    /// Mirror of a gateway-confirmed order
    #[serde(rename = "_remote", default, skip_serializing_if = "is_false")]
    pub remote: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// `user` field: either a bare email string or an account object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OwnerRef {
    Email(String),
    Account(AccountRef),
}

impl OwnerRef {
    pub fn email(&self) -> Option<&str> {
        match self {
            Self::Email(s) if !s.is_empty() => Some(s),
            Self::Email(_) => None,
            Self::Account(acc) => acc.email.as_deref().filter(|s| !s.is_empty()),
        }
    }
}

/// Nested account shape carrying an email
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Order {
    /// Every populated owner alias on this order, in precedence order.
    pub fn owner_aliases(&self) -> Vec<&str> {
        let mut aliases = Vec::new();
        fn push<'a>(aliases: &mut Vec<&'a str>, value: Option<&'a str>) {
            if let Some(v) = value.filter(|s| !s.trim().is_empty()) {
                aliases.push(v);
            }
        }
        push(&mut aliases, self.user_email.as_deref());
        push(&mut aliases, self.email.as_deref());
        push(&mut aliases, self.customer_email.as_deref());
        push(&mut aliases, self.user.as_ref().and_then(OwnerRef::email));
        push(&mut aliases, self.customer.as_ref().and_then(|c| c.email.as_deref()));
        aliases
    }

    /// First populated alias, if any
    pub fn owner_identity(&self) -> Option<&str> {
        self.owner_aliases().first().copied()
    }

    /// Copy the owner identity into every alias field.
    ///
    /// Invariant after this call: either all alias fields hold the
    /// same email, or the order has no recorded owner at all.
    pub fn normalize_owner(&mut self) {
        if let Some(owner) = self.owner_identity().map(str::to_string) {
            self.user_email = Some(owner.clone());
            self.email = Some(owner.clone());
            self.customer_email = Some(owner.clone());
            self.user = Some(OwnerRef::Email(owner));
        }
    }

    /// Normalization applied before any local write: owner aliases and
    /// the display-name fallback.
    pub fn normalize(&mut self) {
        self.normalize_owner();
        if self
            .display_name
            .as_deref()
            .unwrap_or("")
            .trim()
            .is_empty()
        {
            self.display_name = Some(FALLBACK_DISPLAY_NAME.to_string());
        }
    }

    /// `created_at` as epoch seconds, defaulting to the local clock
    pub fn created_at_or_now(&self) -> i64 {
        self.created_at.unwrap_or_else(crate::util::now_secs)
    }
}

/// Denormalized line item snapshot (not a live product reference)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default, deserialize_with = "de_string_like")]
    pub product_id: String,
    /// Captured at checkout; may drift from the current product name
    #[serde(default)]
    pub product_name: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    /// Captured at checkout, immutable thereafter
    #[serde(default)]
    pub unit_price: i64,
}

fn default_quantity() -> i64 {
    1
}

impl OrderItem {
    /// Placeholder name for items the gateway returned nameless
    pub fn display_name(&self) -> String {
        if self.product_name.is_empty() {
            format!("Producto #{}", self.product_id)
        } else {
            self.product_name.clone()
        }
    }
}

/// Order creation payload sent to the gateway
#[derive(Debug, Clone, Serialize)]
pub struct OrderCreate {
    pub user_email: String,
    pub display_name: String,
    pub total_amount: i64,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

/// Line item record on the gateway's `order_item` table.
///
/// Used both as the creation payload (one call per item) and as the
/// row shape when listing the whole table for order enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemCreate {
    #[serde(default, deserialize_with = "de_string_like")]
    pub order_id: String,
    #[serde(default, deserialize_with = "de_string_like")]
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub unit_price: i64,
    #[serde(default)]
    pub product_name: String,
}

impl OrderItemCreate {
    /// Drop the `order_id` and become a plain line item
    pub fn into_item(self) -> OrderItem {
        let item = OrderItem {
            product_id: self.product_id,
            product_name: self.product_name,
            quantity: self.quantity,
            unit_price: self.unit_price,
        };
        OrderItem {
            product_name: item.display_name(),
            ..item
        }
    }
}

/// Status mutation payload (PATCH semantics)
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrderUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
}

/// Accept strings and bare numbers for identifier fields.
///
/// The gateway hands out numeric ids while local orders synthesize
/// string ones; all identity comparisons happen on the string form.
fn de_string_like<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

/// Accept epoch seconds as integer, float, or numeric string.
fn de_epoch<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    })
}
