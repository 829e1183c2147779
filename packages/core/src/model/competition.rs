use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::create_id;

/// Ranking metric for leaderboards and competitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardMetric {
    #[default]
    Sales,
    Revenue,
    Xp,
}

impl LeaderboardMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Revenue => "revenue",
            Self::Xp => "xp",
        }
    }

    /// Parses a metric name, falling back to `Sales` for anything unrecognized.
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl std::fmt::Display for LeaderboardMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LeaderboardMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sales" => Ok(Self::Sales),
            "revenue" => Ok(Self::Revenue),
            "xp" | "experience" => Ok(Self::Xp),
            _ => Err(format!("Unknown leaderboard metric: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionStatus {
    Active,
    Finished,
}

impl CompetitionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Finished => "finished",
        }
    }
}

impl std::fmt::Display for CompetitionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CompetitionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "finished" => Ok(Self::Finished),
            _ => Err(format!("Unknown competition status: {}", s)),
        }
    }
}

/// A time-boxed ranking window. A view definition, not a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competition {
    pub id: String,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub metric: LeaderboardMetric,
    pub status: CompetitionStatus,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Competition {
    pub fn new(
        title: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        metric: LeaderboardMetric,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: create_id(),
            title: title.into(),
            start_date,
            end_date,
            metric,
            status: CompetitionStatus::Active,
            version: 0,
            created_at: now,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_falls_back_to_sales() {
        assert_eq!(LeaderboardMetric::parse_or_default("revenue"), LeaderboardMetric::Revenue);
        assert_eq!(LeaderboardMetric::parse_or_default("XP"), LeaderboardMetric::Xp);
        assert_eq!(LeaderboardMetric::parse_or_default("karma"), LeaderboardMetric::Sales);
        assert_eq!(LeaderboardMetric::parse_or_default(""), LeaderboardMetric::Sales);
    }
}
