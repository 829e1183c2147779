use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::create_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerStatus {
    Trainee,
    Active,
    Inactive,
}

impl ManagerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trainee => "trainee",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for ManagerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ManagerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trainee" => Ok(Self::Trainee),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            _ => Err(format!("Unknown manager status: {}", s)),
        }
    }
}

/// A sales manager earning commission and experience on completed orders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manager {
    pub id: String,
    pub telegram_id: i64,
    pub name: String,
    pub status: ManagerStatus,
    /// 1..=5, always the level derived from `experience_points`
    pub level: u8,
    pub experience_points: i64,
    /// Percent of each sale credited to the manager
    pub commission_rate: u32,
    pub balance: i64,
    pub total_earned: i64,
    pub total_sales: i64,
    pub total_revenue: i64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Manager {
    pub fn new(
        telegram_id: i64,
        name: impl Into<String>,
        commission_rate: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: create_id(),
            telegram_id,
            name: name.into(),
            status: ManagerStatus::Trainee,
            level: 1,
            experience_points: 0,
            commission_rate,
            balance: 0,
            total_earned: 0,
            total_sales: 0,
            total_revenue: 0,
            version: 0,
            created_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ManagerStatus::Active
    }
}
