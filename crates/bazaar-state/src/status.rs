//! # Order Status
//!
//! Status is a join-semilattice over a fixed severity order:
//!
//! ```text
//! pending(1) < confirmed(2) < shipped(3) < completed(4) < canceled(5)
//! ```
//!
//! Merging two observations takes the maximum, so a late-arriving
//! lower-severity message can never move an order backwards.

use serde::{Deserialize, Serialize};

use bazaar_core::TagError;

/// The lifecycle status of an order. Variant order is severity order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order placed, nothing confirmed yet.
    #[default]
    Pending,
    /// Seller acknowledged the order.
    Confirmed,
    /// Goods are in transit.
    Shipped,
    /// Buyer confirmed receipt (terminal).
    Completed,
    /// Order was canceled (terminal).
    Canceled,
}

impl OrderStatus {
    /// Numeric severity, 1 through 5.
    pub fn severity(&self) -> u8 {
        match self {
            Self::Pending => 1,
            Self::Confirmed => 2,
            Self::Shipped => 3,
            Self::Completed => 4,
            Self::Canceled => 5,
        }
    }

    /// Whether this status ends the order lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }

    /// Wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
        }
    }

    /// Parse a `status` tag value. Unknown values are malformed.
    pub fn parse(value: &str) -> Result<Self, TagError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "shipped" => Ok(Self::Shipped),
            "completed" => Ok(Self::Completed),
            "canceled" | "cancelled" => Ok(Self::Canceled),
            _ => Err(TagError::invalid("status", value, "unknown order status")),
        }
    }

    /// The more severe of two statuses.
    pub fn join(self, other: Self) -> Self {
        self.max(other)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
