//! Order status enums
//!
//! The gateway historically stored free-form status strings and two
//! vocabularies circulated at once (a current one and a legacy one
//! from the mobile app). These enums close the set: legacy values are
//! normalized to their canonical variant at the serde boundary and
//! unrecognized strings are rejected instead of passed through.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A status string neither vocabulary knows
#[derive(Debug, Clone, Error)]
#[error("unknown status value: {0:?}")]
pub struct UnknownStatus(pub String);

/// Order lifecycle status (canonical set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Rejected,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
        }
    }

    /// Parse a status string, normalizing the legacy vocabulary.
    pub fn parse(value: &str) -> Result<Self, UnknownStatus> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "rejected" => Ok(Self::Rejected),
            "completed" => Ok(Self::Completed),
            // Legacy vocabulary (mobile app era)
            "processing" => Ok(Self::Pending),
            "shipped" => Ok(Self::Confirmed),
            "delivered" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Rejected),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownStatus> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" | "unpaid" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for PaymentStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PaymentStatus> for String {
    fn from(status: PaymentStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
