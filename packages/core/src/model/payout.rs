use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::create_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Approved,
    Rejected,
    Paid,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Paid => "paid",
        }
    }
}

impl std::fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PayoutStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "paid" => Ok(Self::Paid),
            _ => Err(format!("Unknown payout status: {}", s)),
        }
    }
}

/// A withdrawal requested against a manager's balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerPayout {
    pub id: String,
    pub manager_id: String,
    pub amount: i64,
    pub status: PayoutStatus,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl ManagerPayout {
    pub fn new(manager_id: impl Into<String>, amount: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: create_id(),
            manager_id: manager_id.into(),
            amount,
            status: PayoutStatus::Pending,
            requested_at: now,
            processed_at: None,
            version: 0,
        }
    }
}
