use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::create_id;

/// Placement format sold on a channel (hours pinned on top / hours kept in feed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementFormat {
    #[serde(rename = "1/24")]
    Top1Feed24,
    #[serde(rename = "1/48")]
    Top1Feed48,
    #[serde(rename = "2/48")]
    Top2Feed48,
    #[serde(rename = "native")]
    Native,
}

impl PlacementFormat {
    pub const ALL: [PlacementFormat; 4] = [
        Self::Top1Feed24,
        Self::Top1Feed48,
        Self::Top2Feed48,
        Self::Native,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top1Feed24 => "1/24",
            Self::Top1Feed48 => "1/48",
            Self::Top2Feed48 => "2/48",
            Self::Native => "native",
        }
    }

    /// Price multiplier in percent relative to a 1/24 placement
    pub fn multiplier_percent(&self) -> i64 {
        match self {
            Self::Top1Feed24 => 100,
            Self::Top1Feed48 => 80,
            Self::Top2Feed48 => 160,
            Self::Native => 250,
        }
    }
}

impl std::fmt::Display for PlacementFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PlacementFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1/24" => Ok(Self::Top1Feed24),
            "1/48" => Ok(Self::Top1Feed48),
            "2/48" => Ok(Self::Top2Feed48),
            "native" => Ok(Self::Native),
            _ => Err(format!("Unknown placement format: {}", s)),
        }
    }
}

/// Per-format price table of a channel. `None` means the format is not sold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatPrices {
    #[serde(rename = "1/24")]
    pub top1_feed24: Option<i64>,
    #[serde(rename = "1/48")]
    pub top1_feed48: Option<i64>,
    #[serde(rename = "2/48")]
    pub top2_feed48: Option<i64>,
    pub native: Option<i64>,
}

impl FormatPrices {
    pub fn get(&self, format: PlacementFormat) -> Option<i64> {
        match format {
            PlacementFormat::Top1Feed24 => self.top1_feed24,
            PlacementFormat::Top1Feed48 => self.top1_feed48,
            PlacementFormat::Top2Feed48 => self.top2_feed48,
            PlacementFormat::Native => self.native,
        }
    }

    pub fn set(&mut self, format: PlacementFormat, price: Option<i64>) {
        let slot = match format {
            PlacementFormat::Top1Feed24 => &mut self.top1_feed24,
            PlacementFormat::Top1Feed48 => &mut self.top1_feed48,
            PlacementFormat::Top2Feed48 => &mut self.top2_feed48,
            PlacementFormat::Native => &mut self.native,
        };
        *slot = price;
    }
}

/// Rolling analytics snapshot, refreshed from the analytics provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelAnalytics {
    pub subscribers: i64,
    pub reach_24h: i64,
    pub reach_48h: i64,
    pub reach_72h: i64,
    /// Engagement rate over a post's lifetime, in percent
    pub err_percent: f64,
    /// Engagement rate over the first 24 hours, in percent
    pub err24_percent: f64,
    /// Cost per mille derived from the 1/24 price and 24h reach
    pub cpm: Option<i64>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    /// Identifier of the channel on the messaging platform
    pub external_id: String,
    pub title: String,
    pub username: Option<String>,
    pub category: String,
    pub prices: FormatPrices,
    pub analytics: ChannelAnalytics,
    pub is_active: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Channel {
    pub fn new(
        external_id: impl Into<String>,
        title: impl Into<String>,
        category: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: create_id(),
            external_id: external_id.into(),
            title: title.into(),
            username: None,
            category: category.into(),
            prices: FormatPrices::default(),
            analytics: ChannelAnalytics::default(),
            is_active: true,
            version: 0,
            created_at: now,
        }
    }

    /// Replaces the analytics snapshot and re-derives the CPM from the 1/24 price.
    pub fn apply_analytics(&mut self, mut analytics: ChannelAnalytics) {
        analytics.cpm = match (self.prices.top1_feed24, analytics.reach_24h) {
            (Some(price), reach) if reach > 0 => Some(price * 1000 / reach),
            _ => None,
        };
        self.analytics = analytics;
    }
}
