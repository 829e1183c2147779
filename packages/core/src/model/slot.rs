use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::create_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Available,
    Reserved,
    Booked,
    /// The slot's time passed without being booked
    Expired,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Reserved => "reserved",
            Self::Booked => "booked",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SlotStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "available" => Ok(Self::Available),
            "reserved" => Ok(Self::Reserved),
            "booked" => Ok(Self::Booked),
            "expired" => Ok(Self::Expired),
            _ => Err(format!("Unknown slot status: {}", s)),
        }
    }
}

/// A bookable (channel, date, time) triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: String,
    pub channel_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: SlotStatus,
    /// Current holder while reserved, the booker once booked
    pub holder_id: Option<String>,
    pub reserved_until: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Slot {
    pub fn new(
        channel_id: impl Into<String>,
        date: NaiveDate,
        time: NaiveTime,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: create_id(),
            channel_id: channel_id.into(),
            date,
            time,
            status: SlotStatus::Available,
            holder_id: None,
            reserved_until: None,
            version: 0,
            created_at: now,
        }
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    /// A reservation whose deadline has passed. Lazily treated as available.
    pub fn hold_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == SlotStatus::Reserved
            && self.reserved_until.map(|until| now > until).unwrap_or(true)
    }

    pub fn is_held_by(&self, holder_id: &str) -> bool {
        self.status == SlotStatus::Reserved && self.holder_id.as_deref() == Some(holder_id)
    }

    pub fn is_booked_by(&self, holder_id: &str) -> bool {
        self.status == SlotStatus::Booked && self.holder_id.as_deref() == Some(holder_id)
    }

    pub(crate) fn into_available(mut self) -> Self {
        self.status = SlotStatus::Available;
        self.holder_id = None;
        self.reserved_until = None;
        self
    }
}
