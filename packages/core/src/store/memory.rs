//! In-memory booking store
//!
//! Used by tests and single-process deployments. Every commit runs under one
//! write lock, so a batch is validated and applied without interleaving.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{BookingStore, StoreError, StoreResult, Versioned, Write};
use crate::model::{
    Channel, Client, Competition, Manager, ManagerPayout, Order, OrderStatus, Slot, SlotStatus,
};

#[derive(Debug, Default)]
struct Tables {
    channels: HashMap<String, Channel>,
    slots: HashMap<String, Slot>,
    clients: HashMap<String, Client>,
    managers: HashMap<String, Manager>,
    manager_order: Vec<String>,
    orders: HashMap<String, Order>,
    payouts: HashMap<String, ManagerPayout>,
    competitions: HashMap<String, Competition>,
}

fn check<T: Versioned>(table: &HashMap<String, T>, write: &Write, record: &T) -> StoreResult<()> {
    match (write.is_insert(), table.get(write.id())) {
        (true, Some(_)) => Err(write.already_exists()),
        (true, None) => Ok(()),
        (false, Some(stored)) if stored.version() == record.version() => Ok(()),
        (false, _) => Err(write.conflict()),
    }
}

fn put<T: Versioned>(table: &mut HashMap<String, T>, id: String, mut record: T, insert: bool) {
    if !insert {
        record.bump();
    }
    table.insert(id, record);
}

impl Tables {
    fn check(&self, write: &Write) -> StoreResult<()> {
        match write {
            Write::InsertChannel(r) | Write::UpdateChannel(r) => check(&self.channels, write, r),
            Write::InsertSlot(r) | Write::UpdateSlot(r) => check(&self.slots, write, r),
            Write::InsertClient(r) | Write::UpdateClient(r) => check(&self.clients, write, r),
            Write::InsertManager(r) | Write::UpdateManager(r) => check(&self.managers, write, r),
            Write::InsertOrder(r) | Write::UpdateOrder(r) => check(&self.orders, write, r),
            Write::InsertPayout(r) | Write::UpdatePayout(r) => check(&self.payouts, write, r),
            Write::InsertCompetition(r) | Write::UpdateCompetition(r) => {
                check(&self.competitions, write, r)
            }
        }
    }

    fn apply(&mut self, write: Write) {
        let insert = write.is_insert();
        let id = write.id().to_string();
        match write {
            Write::InsertChannel(r) | Write::UpdateChannel(r) => {
                put(&mut self.channels, id, r, insert)
            }
            Write::InsertSlot(r) | Write::UpdateSlot(r) => put(&mut self.slots, id, r, insert),
            Write::InsertClient(r) | Write::UpdateClient(r) => {
                put(&mut self.clients, id, r, insert)
            }
            Write::InsertManager(r) | Write::UpdateManager(r) => {
                if insert {
                    self.manager_order.push(id.clone());
                }
                put(&mut self.managers, id, r, insert)
            }
            Write::InsertOrder(r) | Write::UpdateOrder(r) => put(&mut self.orders, id, r, insert),
            Write::InsertPayout(r) | Write::UpdatePayout(r) => {
                put(&mut self.payouts, id, r, insert)
            }
            Write::InsertCompetition(r) | Write::UpdateCompetition(r) => {
                put(&mut self.competitions, id, r, insert)
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get_channel(&self, id: &str) -> StoreResult<Option<Channel>> {
        Ok(self.tables.read().channels.get(id).cloned())
    }

    async fn get_slot(&self, id: &str) -> StoreResult<Option<Slot>> {
        Ok(self.tables.read().slots.get(id).cloned())
    }

    async fn list_slots_for_channel(
        &self,
        channel_id: &str,
        from: NaiveDate,
    ) -> StoreResult<Vec<Slot>> {
        let tables = self.tables.read();
        let mut slots: Vec<Slot> = tables
            .slots
            .values()
            .filter(|s| s.channel_id == channel_id && s.date >= from)
            .cloned()
            .collect();
        slots.sort_by_key(|s| s.starts_at());
        Ok(slots)
    }

    async fn get_client(&self, id: &str) -> StoreResult<Option<Client>> {
        Ok(self.tables.read().clients.get(id).cloned())
    }

    async fn get_manager(&self, id: &str) -> StoreResult<Option<Manager>> {
        Ok(self.tables.read().managers.get(id).cloned())
    }

    async fn list_managers(&self) -> StoreResult<Vec<Manager>> {
        let tables = self.tables.read();
        Ok(tables
            .manager_order
            .iter()
            .filter_map(|id| tables.managers.get(id).cloned())
            .collect())
    }

    async fn get_order(&self, id: &str) -> StoreResult<Option<Order>> {
        Ok(self.tables.read().orders.get(id).cloned())
    }

    async fn find_open_order_for_slot(&self, slot_id: &str) -> StoreResult<Option<Order>> {
        Ok(self
            .tables
            .read()
            .orders
            .values()
            .find(|o| o.slot_id == slot_id && o.status != OrderStatus::Cancelled)
            .cloned())
    }

    async fn list_completed_orders(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Order>> {
        let tables = self.tables.read();
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| o.status == OrderStatus::Completed)
            .filter(|o| o.completed_at.is_some_and(|at| from <= at && at < to))
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.completed_at);
        Ok(orders)
    }

    async fn get_payout(&self, id: &str) -> StoreResult<Option<ManagerPayout>> {
        Ok(self.tables.read().payouts.get(id).cloned())
    }

    async fn get_competition(&self, id: &str) -> StoreResult<Option<Competition>> {
        Ok(self.tables.read().competitions.get(id).cloned())
    }

    async fn commit(&self, writes: Vec<Write>) -> StoreResult<()> {
        let mut tables = self.tables.write();

        let mut touched = HashSet::with_capacity(writes.len());
        for write in &writes {
            if !touched.insert((write.entity(), write.id().to_string())) {
                return Err(StoreError::Database(format!(
                    "{} {} appears twice in one commit",
                    write.entity(),
                    write.id()
                )));
            }
            tables.check(write)?;
        }

        for write in writes {
            tables.apply(write);
        }
        Ok(())
    }

    async fn reclaim_expired_slots(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut tables = self.tables.write();
        let mut reclaimed = 0;
        for slot in tables.slots.values_mut() {
            if slot.hold_expired(now) {
                slot.status = SlotStatus::Available;
                slot.holder_id = None;
                slot.reserved_until = None;
                slot.bump();
                reclaimed += 1;
            }
        }
        Ok(reclaimed)
    }

    async fn expire_past_slots(&self, before: NaiveDate) -> StoreResult<u64> {
        let mut tables = self.tables.write();
        let mut expired = 0;
        for slot in tables.slots.values_mut() {
            if slot.status == SlotStatus::Available && slot.date < before {
                slot.status = SlotStatus::Expired;
                slot.bump();
                expired += 1;
            }
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveTime};

    fn slot(now: DateTime<Utc>) -> Slot {
        Slot::new(
            "channel",
            NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            now,
        )
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let store = InMemoryStore::new();
        let slot = slot(Utc::now());
        store.commit(vec![Write::InsertSlot(slot.clone())]).await.unwrap();

        let mut next = slot.clone();
        next.status = SlotStatus::Reserved;
        store.commit(vec![Write::UpdateSlot(next)]).await.unwrap();

        let stored = store.get_slot(&slot.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.status, SlotStatus::Reserved);
    }

    #[tokio::test]
    async fn test_stale_update_conflicts_and_applies_nothing() {
        let store = InMemoryStore::new();
        let slot = slot(Utc::now());
        let manager = Manager::new(1, "Ann", 10, Utc::now());
        store
            .commit(vec![
                Write::InsertSlot(slot.clone()),
                Write::InsertManager(manager.clone()),
            ])
            .await
            .unwrap();
        store.commit(vec![Write::UpdateSlot(slot.clone())]).await.unwrap();

        let mut richer = manager.clone();
        richer.balance = 500;
        let err = store
            .commit(vec![Write::UpdateManager(richer), Write::UpdateSlot(slot.clone())])
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let stored = store.get_manager(&manager.id).await.unwrap().unwrap();
        assert_eq!(stored.balance, 0);
        assert_eq!(stored.version, 0);
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = InMemoryStore::new();
        let slot = slot(Utc::now());
        store.commit(vec![Write::InsertSlot(slot.clone())]).await.unwrap();
        let err = store.commit(vec![Write::InsertSlot(slot)]).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_reclaim_only_touches_lapsed_holds() {
        let store = InMemoryStore::new();
        let now = Utc::now();

        let mut lapsed = slot(now);
        lapsed.status = SlotStatus::Reserved;
        lapsed.holder_id = Some("a".into());
        lapsed.reserved_until = Some(now - Duration::seconds(1));

        let mut live = slot(now);
        live.status = SlotStatus::Reserved;
        live.holder_id = Some("b".into());
        live.reserved_until = Some(now + Duration::seconds(60));

        store
            .commit(vec![Write::InsertSlot(lapsed.clone()), Write::InsertSlot(live.clone())])
            .await
            .unwrap();

        assert_eq!(store.reclaim_expired_slots(now).await.unwrap(), 1);
        assert_eq!(store.reclaim_expired_slots(now).await.unwrap(), 0);

        let lapsed = store.get_slot(&lapsed.id).await.unwrap().unwrap();
        assert_eq!(lapsed.status, SlotStatus::Available);
        assert_eq!(lapsed.holder_id, None);
        let live = store.get_slot(&live.id).await.unwrap().unwrap();
        assert_eq!(live.status, SlotStatus::Reserved);
    }

    #[tokio::test]
    async fn test_managers_listed_in_creation_order() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let names = ["first", "second", "third"];
        for (i, name) in names.iter().enumerate() {
            store
                .commit(vec![Write::InsertManager(Manager::new(i as i64, *name, 10, now))])
                .await
                .unwrap();
        }
        let listed: Vec<String> = store
            .list_managers()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(listed, names);
    }
}
