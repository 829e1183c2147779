//! Records shared by the ledger, the order workflow and the progression engine.
//!
//! Every record carries a `version` used for optimistic concurrency: stores
//! only accept an update whose version matches the stored one and bump it on
//! success.

mod channel;
mod client;
mod competition;
mod manager;
mod order;
mod payout;
mod slot;

pub use channel::{Channel, ChannelAnalytics, FormatPrices, PlacementFormat};
pub use client::Client;
pub use competition::{Competition, CompetitionStatus, LeaderboardMetric};
pub use manager::{Manager, ManagerStatus};
pub use order::{Order, OrderStatus, discounted_price};
pub use payout::{ManagerPayout, PayoutStatus};
pub use slot::{Slot, SlotStatus};
