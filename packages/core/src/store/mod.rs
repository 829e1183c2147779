//! Booking store abstraction
//!
//! The ledger, order workflow and progression engine never mutate records in
//! place. They read a record, decide the next state, and hand the store a
//! batch of [`Write`]s. The store applies the whole batch or nothing:
//!
//! - inserts fail if the id already exists,
//! - updates succeed only if the stored `version` still equals the version the
//!   record was read at, and persist it with `version + 1`.
//!
//! A failed version check surfaces as [`StoreError::Conflict`], which callers
//! resolve by re-reading and re-deciding. This is the compare-and-set that
//! makes slot reservation linearizable and keeps manager counters from losing
//! concurrent increments.
//!
//! ## Backends
//!
//! | Backend | Crate | Best For |
//! |---------|-------|----------|
//! | Memory | `adslot` | Tests, local development, single process |
//! | PostgreSQL | `adslot-api` | Production, shared between replicas |

mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt::Debug;

use crate::model::{Channel, Client, Competition, Manager, ManagerPayout, Order, Slot};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Error type for store operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Record not found: {entity} {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Version conflict on {entity} {id}")]
    Conflict { entity: &'static str, id: String },

    #[error("Record already exists: {entity} {id}")]
    AlreadyExists { entity: &'static str, id: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// One element of an atomic commit
#[derive(Debug, Clone)]
pub enum Write {
    InsertChannel(Channel),
    UpdateChannel(Channel),
    InsertSlot(Slot),
    UpdateSlot(Slot),
    InsertClient(Client),
    UpdateClient(Client),
    InsertManager(Manager),
    UpdateManager(Manager),
    InsertOrder(Order),
    UpdateOrder(Order),
    InsertPayout(ManagerPayout),
    UpdatePayout(ManagerPayout),
    InsertCompetition(Competition),
    UpdateCompetition(Competition),
}

impl Write {
    pub fn entity(&self) -> &'static str {
        match self {
            Self::InsertChannel(_) | Self::UpdateChannel(_) => "channel",
            Self::InsertSlot(_) | Self::UpdateSlot(_) => "slot",
            Self::InsertClient(_) | Self::UpdateClient(_) => "client",
            Self::InsertManager(_) | Self::UpdateManager(_) => "manager",
            Self::InsertOrder(_) | Self::UpdateOrder(_) => "order",
            Self::InsertPayout(_) | Self::UpdatePayout(_) => "payout",
            Self::InsertCompetition(_) | Self::UpdateCompetition(_) => "competition",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::InsertChannel(r) | Self::UpdateChannel(r) => &r.id,
            Self::InsertSlot(r) | Self::UpdateSlot(r) => &r.id,
            Self::InsertClient(r) | Self::UpdateClient(r) => &r.id,
            Self::InsertManager(r) | Self::UpdateManager(r) => &r.id,
            Self::InsertOrder(r) | Self::UpdateOrder(r) => &r.id,
            Self::InsertPayout(r) | Self::UpdatePayout(r) => &r.id,
            Self::InsertCompetition(r) | Self::UpdateCompetition(r) => &r.id,
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(
            self,
            Self::InsertChannel(_)
                | Self::InsertSlot(_)
                | Self::InsertClient(_)
                | Self::InsertManager(_)
                | Self::InsertOrder(_)
                | Self::InsertPayout(_)
                | Self::InsertCompetition(_)
        )
    }

    pub fn conflict(&self) -> StoreError {
        StoreError::Conflict {
            entity: self.entity(),
            id: self.id().to_string(),
        }
    }

    pub fn already_exists(&self) -> StoreError {
        StoreError::AlreadyExists {
            entity: self.entity(),
            id: self.id().to_string(),
        }
    }
}

/// Records guarded by an optimistic-concurrency version
pub trait Versioned {
    fn version(&self) -> i64;

    /// Mirrors what the store did on a successful update
    fn bump(&mut self);
}

macro_rules! impl_versioned {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Versioned for $ty {
                fn version(&self) -> i64 {
                    self.version
                }

                fn bump(&mut self) {
                    self.version += 1;
                }
            }
        )*
    };
}

impl_versioned!(Channel, Slot, Client, Manager, Order, ManagerPayout, Competition);

/// Trait for booking storage backends
#[async_trait]
pub trait BookingStore: Send + Sync + Debug {
    /// Get backend name for logging
    fn backend_name(&self) -> &'static str;

    // ========================================================================
    // Reads
    // ========================================================================

    async fn get_channel(&self, id: &str) -> StoreResult<Option<Channel>>;

    async fn get_slot(&self, id: &str) -> StoreResult<Option<Slot>>;

    /// Slots of a channel on or after `from`, ordered by date and time
    async fn list_slots_for_channel(
        &self,
        channel_id: &str,
        from: NaiveDate,
    ) -> StoreResult<Vec<Slot>>;

    async fn get_client(&self, id: &str) -> StoreResult<Option<Client>>;

    async fn get_manager(&self, id: &str) -> StoreResult<Option<Manager>>;

    /// All managers in creation order
    async fn list_managers(&self) -> StoreResult<Vec<Manager>>;

    async fn get_order(&self, id: &str) -> StoreResult<Option<Order>>;

    /// The non-cancelled order placed on a slot, if any
    async fn find_open_order_for_slot(&self, slot_id: &str) -> StoreResult<Option<Order>>;

    /// Completed orders with `from <= completed_at < to`
    async fn list_completed_orders(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Order>>;

    async fn get_payout(&self, id: &str) -> StoreResult<Option<ManagerPayout>>;

    async fn get_competition(&self, id: &str) -> StoreResult<Option<Competition>>;

    // ========================================================================
    // Writes
    // ========================================================================

    /// Apply all writes atomically, or none of them
    async fn commit(&self, writes: Vec<Write>) -> StoreResult<()>;

    /// Return every reserved slot whose hold ended before `now` to available.
    /// Each row is updated conditionally, so this is safe next to `commit`.
    async fn reclaim_expired_slots(&self, now: DateTime<Utc>) -> StoreResult<u64>;

    /// Mark available slots dated before `before` as expired
    async fn expire_past_slots(&self, before: NaiveDate) -> StoreResult<u64>;
}
