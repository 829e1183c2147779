use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PlacementFormat;
use crate::create_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    PaymentUploaded,
    /// Creative is under content review
    Moderation,
    Rejected,
    PaymentConfirmed,
    Posted,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PaymentUploaded => "payment_uploaded",
            Self::Moderation => "moderation",
            Self::Rejected => "rejected",
            Self::PaymentConfirmed => "payment_confirmed",
            Self::Posted => "posted",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Cancelling from these states hands the slot back to the ledger.
    /// Once payment is confirmed the slot needs manual reconciliation.
    pub fn releases_slot_on_cancel(&self) -> bool {
        matches!(
            self,
            Self::Pending | Self::PaymentUploaded | Self::Moderation | Self::Rejected
        )
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        match (*self, next) {
            (Completed, _) | (Cancelled, _) => false,
            (_, Cancelled) => true,
            (Pending, PaymentUploaded)
            | (PaymentUploaded, Moderation)
            | (PaymentUploaded, PaymentConfirmed)
            | (Moderation, PaymentConfirmed)
            | (Moderation, Rejected)
            | (PaymentConfirmed, Posted)
            | (Posted, Completed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "payment_uploaded" => Ok(Self::PaymentUploaded),
            "moderation" => Ok(Self::Moderation),
            "rejected" => Ok(Self::Rejected),
            "payment_confirmed" => Ok(Self::PaymentConfirmed),
            "posted" => Ok(Self::Posted),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown order status: {}", s)),
        }
    }
}

/// `base_price × (1 − discount/100)`, truncated toward zero
pub fn discounted_price(base_price: i64, discount_percent: u8) -> i64 {
    let keep = i128::from(100 - discount_percent.min(100));
    // never larger in magnitude than base_price
    (i128::from(base_price) * keep / 100) as i64
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub slot_id: String,
    pub client_id: String,
    pub manager_id: Option<String>,
    pub format: PlacementFormat,
    pub base_price: i64,
    pub discount_percent: u8,
    /// Frozen at creation; later price-table edits do not touch it
    pub final_price: i64,
    pub status: OrderStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub posted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        slot_id: impl Into<String>,
        client_id: impl Into<String>,
        manager_id: Option<String>,
        format: PlacementFormat,
        base_price: i64,
        discount_percent: u8,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: create_id(),
            slot_id: slot_id.into(),
            client_id: client_id.into(),
            manager_id,
            format,
            base_price,
            discount_percent,
            final_price: discounted_price(base_price, discount_percent),
            status: OrderStatus::Pending,
            paid_at: None,
            posted_at: None,
            completed_at: None,
            cancelled_at: None,
            version: 0,
            created_at: now,
        }
    }
}
