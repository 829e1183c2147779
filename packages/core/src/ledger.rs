//! Slot ledger: reservation lifecycle of bookable (channel, date, time) slots.
//!
//! ```text
//! available ──reserve──▶ reserved ──confirm──▶ booked
//!     ▲                     │
//!     └──release / expiry───┘
//! ```
//!
//! Every transition is decided on a fresh read and committed as a versioned
//! compare-and-set. Of two concurrent reservations on one available slot
//! exactly one commits; the other re-reads, sees the new holder, and gets
//! [`LedgerError::AlreadyReserved`].

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::clock::Clock;
use crate::model::{Slot, SlotStatus};
use crate::store::{BookingStore, StoreError, Versioned, Write};

/// Upper bound on re-reads after a lost compare-and-set
pub const MAX_CAS_ATTEMPTS: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Slot not found: {0}")]
    NotFound(String),

    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Slot {0} is already reserved")]
    AlreadyReserved(String),

    #[error("Slot {0} can no longer be booked")]
    Unavailable(String),

    #[error("Slot {slot_id} is not held by {holder_id}")]
    NotHolder { slot_id: String, holder_id: String },

    #[error("Reservation on slot {0} has expired")]
    Expired(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Outcome of deciding a transition on a freshly read slot
pub(crate) enum Decision {
    Commit(Slot),
    Unchanged(Slot),
}

pub(crate) fn decide_reserve(
    slot: Slot,
    holder_id: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<Decision, LedgerError> {
    match slot.status {
        SlotStatus::Available => {}
        SlotStatus::Reserved if slot.hold_expired(now) => {
            debug!(slot_id = %slot.id, "Taking over lapsed hold");
        }
        SlotStatus::Reserved | SlotStatus::Booked => {
            return Err(LedgerError::AlreadyReserved(slot.id));
        }
        SlotStatus::Expired => return Err(LedgerError::Unavailable(slot.id)),
    }

    let mut next = slot;
    next.status = SlotStatus::Reserved;
    next.holder_id = Some(holder_id.to_string());
    next.reserved_until = Some(now + ttl);
    Ok(Decision::Commit(next))
}

/// Releases a live hold. Booked slots belong to their order and are only
/// returned through [`decide_unbook`].
pub(crate) fn decide_release(slot: Slot, holder_id: &str) -> Result<Decision, LedgerError> {
    if slot.is_booked_by(holder_id) {
        return Err(LedgerError::Unavailable(slot.id));
    }
    if slot.is_held_by(holder_id) {
        return Ok(Decision::Commit(slot.into_available()));
    }
    Err(LedgerError::NotHolder {
        slot_id: slot.id,
        holder_id: holder_id.to_string(),
    })
}

/// Returns the slot of an order cancelled before publication to available
pub(crate) fn decide_unbook(slot: Slot, holder_id: &str) -> Result<Decision, LedgerError> {
    if slot.is_booked_by(holder_id) || slot.is_held_by(holder_id) {
        return Ok(Decision::Commit(slot.into_available()));
    }
    Err(LedgerError::NotHolder {
        slot_id: slot.id,
        holder_id: holder_id.to_string(),
    })
}

pub(crate) fn decide_confirm(
    slot: Slot,
    holder_id: &str,
    now: DateTime<Utc>,
) -> Result<Decision, LedgerError> {
    if slot.is_booked_by(holder_id) {
        return Ok(Decision::Unchanged(slot));
    }
    if !slot.is_held_by(holder_id) {
        return Err(LedgerError::NotHolder {
            slot_id: slot.id,
            holder_id: holder_id.to_string(),
        });
    }
    if slot.hold_expired(now) {
        return Err(LedgerError::Expired(slot.id));
    }

    let mut next = slot;
    next.status = SlotStatus::Booked;
    next.reserved_until = None;
    Ok(Decision::Commit(next))
}

#[derive(Debug, Clone)]
pub struct SlotLedger {
    store: Arc<dyn BookingStore>,
    clock: Arc<dyn Clock>,
}

impl SlotLedger {
    pub fn new(store: Arc<dyn BookingStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn get(&self, slot_id: &str) -> Result<Slot, LedgerError> {
        self.store
            .get_slot(slot_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(slot_id.to_string()))
    }

    /// Upcoming slots of a channel, starting today
    pub async fn upcoming(&self, channel_id: &str) -> Result<Vec<Slot>, LedgerError> {
        let today = self.clock.now().date_naive();
        Ok(self.store.list_slots_for_channel(channel_id, today).await?)
    }

    /// Adds a new available slot to a channel's schedule
    #[instrument(name = "ledger.open_slot", skip(self))]
    pub async fn open_slot(
        &self,
        channel_id: &str,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Slot, LedgerError> {
        if self.store.get_channel(channel_id).await?.is_none() {
            return Err(LedgerError::ChannelNotFound(channel_id.to_string()));
        }
        let slot = Slot::new(channel_id, date, time, self.clock.now());
        self.store.commit(vec![Write::InsertSlot(slot.clone())]).await?;
        info!(slot_id = %slot.id, "Opened slot");
        Ok(slot)
    }

    #[instrument(name = "ledger.reserve", skip(self))]
    pub async fn reserve(
        &self,
        slot_id: &str,
        holder_id: &str,
        ttl: Duration,
    ) -> Result<Slot, LedgerError> {
        let slot = self
            .transition(slot_id, |slot, now| decide_reserve(slot, holder_id, ttl, now))
            .await?;
        info!(slot_id, holder_id, until = ?slot.reserved_until, "Slot reserved");
        Ok(slot)
    }

    #[instrument(name = "ledger.release", skip(self))]
    pub async fn release(&self, slot_id: &str, holder_id: &str) -> Result<Slot, LedgerError> {
        let slot = self
            .transition(slot_id, |slot, _| decide_release(slot, holder_id))
            .await?;
        info!(slot_id, holder_id, "Slot released");
        Ok(slot)
    }

    #[instrument(name = "ledger.confirm", skip(self))]
    pub async fn confirm(&self, slot_id: &str, holder_id: &str) -> Result<Slot, LedgerError> {
        let slot = self
            .transition(slot_id, |slot, now| decide_confirm(slot, holder_id, now))
            .await?;
        info!(slot_id, holder_id, "Slot booked");
        Ok(slot)
    }

    /// Returns lapsed holds to available. Safe to run next to live traffic.
    pub async fn reclaim_expired(&self) -> Result<u64, LedgerError> {
        let reclaimed = self.store.reclaim_expired_slots(self.clock.now()).await?;
        if reclaimed > 0 {
            info!(reclaimed, "Reclaimed expired reservations");
        }
        Ok(reclaimed)
    }

    /// Marks available slots dated before today as expired
    pub async fn expire_past_slots(&self) -> Result<u64, LedgerError> {
        let today = self.clock.now().date_naive();
        let expired = self.store.expire_past_slots(today).await?;
        if expired > 0 {
            info!(expired, %today, "Expired past slots");
        }
        Ok(expired)
    }

    async fn transition<F>(&self, slot_id: &str, decide: F) -> Result<Slot, LedgerError>
    where
        F: Fn(Slot, DateTime<Utc>) -> Result<Decision, LedgerError>,
    {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let slot = self.get(slot_id).await?;
            let mut next = match decide(slot, self.clock.now())? {
                Decision::Unchanged(slot) => return Ok(slot),
                Decision::Commit(next) => next,
            };

            match self.store.commit(vec![Write::UpdateSlot(next.clone())]).await {
                Ok(()) => {
                    next.bump();
                    return Ok(next);
                }
                Err(e) if e.is_conflict() => {
                    debug!(slot_id, attempt, "Lost slot update race, re-reading");
                }
                Err(e) => return Err(e.into()),
            }
        }

        debug!(slot_id, "Gave up after repeated slot contention");
        Err(LedgerError::AlreadyReserved(slot_id.to_string()))
    }
}
