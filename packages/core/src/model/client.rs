use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::create_id;

/// An advertiser buying slots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub telegram_id: i64,
    pub name: String,
    pub total_orders: i64,
    pub total_spent: i64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Client {
    pub fn new(telegram_id: i64, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: create_id(),
            telegram_id,
            name: name.into(),
            total_orders: 0,
            total_spent: 0,
            version: 0,
            created_at: now,
        }
    }

    /// Returns `None` and leaves the client untouched when a counter would overflow
    pub(crate) fn record_completed_order(&mut self, final_price: i64) -> Option<()> {
        let total_orders = self.total_orders.checked_add(1)?;
        let total_spent = self.total_spent.checked_add(final_price)?;
        self.total_orders = total_orders;
        self.total_spent = total_spent;
        Some(())
    }
}
