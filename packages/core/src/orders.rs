//! Order workflow: creation against a held slot and status progression.
//!
//! Completion is the only transition with side effects beyond the order row:
//! the client's counters, the manager's sale counters and progression all
//! change in the same commit as the status, so a completion is applied at
//! most once even when requested concurrently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::clock::Clock;
use crate::ledger::{Decision, LedgerError, MAX_CAS_ATTEMPTS, SlotLedger, decide_unbook};
use crate::model::{Order, OrderStatus, PlacementFormat, Slot};
use crate::posting::PostScheduler;
use crate::progression::{ProgressionEngine, ProgressionError, SaleAward};
use crate::store::{BookingStore, StoreError, Versioned, Write};

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Slot not found: {0}")]
    SlotNotFound(String),

    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Client not found: {0}")]
    ClientNotFound(String),

    #[error("Manager not found: {0}")]
    ManagerNotFound(String),

    #[error("Slot {slot_id} is not held by client {client_id}")]
    SlotNotHeldByClient { slot_id: String, client_id: String },

    #[error("Slot {0} already has an order")]
    SlotAlreadyOrdered(String),

    #[error("Channel {channel_id} has no price for format {format}")]
    PriceNotConfigured {
        channel_id: String,
        format: PlacementFormat,
    },

    #[error("Discount must be within 0-100 percent: {0}")]
    InvalidDiscount(u8),

    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Completing order {0} would overflow the client's counters")]
    CounterOverflow(String),

    #[error("Order {0} is too contended to update")]
    Contended(String),

    #[error(transparent)]
    Progression(#[from] ProgressionError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub slot_id: String,
    pub client_id: String,
    #[serde(default)]
    pub manager_id: Option<String>,
    pub format: PlacementFormat,
    #[serde(default)]
    pub discount_percent: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub order: Order,
    /// False when the order already was in the requested status
    pub changed: bool,
    /// Present when the transition completed a manager's sale
    pub award: Option<SaleAward>,
}

#[derive(Debug, Clone)]
pub struct OrderWorkflow {
    store: Arc<dyn BookingStore>,
    clock: Arc<dyn Clock>,
    ledger: SlotLedger,
    progression: ProgressionEngine,
    posting: Arc<dyn PostScheduler>,
}

impl OrderWorkflow {
    pub fn new(
        store: Arc<dyn BookingStore>,
        clock: Arc<dyn Clock>,
        ledger: SlotLedger,
        progression: ProgressionEngine,
        posting: Arc<dyn PostScheduler>,
    ) -> Self {
        Self {
            store,
            clock,
            ledger,
            progression,
            posting,
        }
    }

    pub async fn get_order(&self, order_id: &str) -> Result<Order, OrderError> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))
    }

    /// Books the client's held slot and records a pending order on it
    #[instrument(name = "orders.create", skip(self, request), fields(slot_id = %request.slot_id, client_id = %request.client_id))]
    pub async fn create_order(&self, request: NewOrder) -> Result<Order, OrderError> {
        if request.discount_percent > 100 {
            return Err(OrderError::InvalidDiscount(request.discount_percent));
        }
        if self.store.get_client(&request.client_id).await?.is_none() {
            return Err(OrderError::ClientNotFound(request.client_id));
        }
        if let Some(manager_id) = &request.manager_id
            && self.store.get_manager(manager_id).await?.is_none()
        {
            return Err(OrderError::ManagerNotFound(manager_id.clone()));
        }

        let slot = self.load_slot(&request.slot_id).await?;
        let channel = self
            .store
            .get_channel(&slot.channel_id)
            .await?
            .ok_or_else(|| OrderError::ChannelNotFound(slot.channel_id.clone()))?;
        let base_price =
            channel
                .prices
                .get(request.format)
                .ok_or_else(|| OrderError::PriceNotConfigured {
                    channel_id: channel.id.clone(),
                    format: request.format,
                })?;

        self.ledger
            .confirm(&request.slot_id, &request.client_id)
            .await
            .map_err(|e| self.map_ledger_error(e, &request))?;

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let slot = self.load_slot(&request.slot_id).await?;
            if !slot.is_booked_by(&request.client_id) {
                return Err(OrderError::SlotNotHeldByClient {
                    slot_id: request.slot_id,
                    client_id: request.client_id,
                });
            }
            if self.store.find_open_order_for_slot(&slot.id).await?.is_some() {
                return Err(OrderError::SlotAlreadyOrdered(slot.id));
            }

            let order = Order::new(
                &slot.id,
                &request.client_id,
                request.manager_id.clone(),
                request.format,
                base_price,
                request.discount_percent,
                self.clock.now(),
            );

            // The slot write only bumps its version so a concurrent create on
            // the same slot loses the race.
            match self
                .store
                .commit(vec![Write::UpdateSlot(slot), Write::InsertOrder(order.clone())])
                .await
            {
                Ok(()) => {
                    info!(order_id = %order.id, final_price = order.final_price, "Order created");
                    return Ok(order);
                }
                Err(e) if e.is_conflict() => {
                    debug!(attempt, "Slot changed while creating order, re-checking");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(OrderError::SlotAlreadyOrdered(request.slot_id))
    }

    #[instrument(name = "orders.transition", skip(self))]
    pub async fn transition(
        &self,
        order_id: &str,
        next: OrderStatus,
    ) -> Result<TransitionOutcome, OrderError> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let order = self.get_order(order_id).await?;
            if order.status == next {
                return Ok(TransitionOutcome {
                    order,
                    changed: false,
                    award: None,
                });
            }
            if !order.status.can_transition_to(next) {
                return Err(OrderError::InvalidTransition {
                    from: order.status,
                    to: next,
                });
            }

            let now = self.clock.now();
            let (mut updated, writes, award) = self.plan_transition(order, next, now).await?;

            match self.store.commit(writes).await {
                Ok(()) => {
                    updated.bump();
                    info!(order_id, status = %next, "Order status changed");
                    if next == OrderStatus::Posted
                        && let Err(e) = self.posting.schedule_post(&updated).await
                    {
                        warn!(order_id, error = %e, "Post scheduling failed");
                    }
                    return Ok(TransitionOutcome {
                        order: updated,
                        changed: true,
                        award,
                    });
                }
                Err(e) if e.is_conflict() => {
                    debug!(order_id, attempt, "Order changed concurrently, re-reading");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(OrderError::Contended(order_id.to_string()))
    }

    async fn plan_transition(
        &self,
        order: Order,
        next: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<(Order, Vec<Write>, Option<SaleAward>), OrderError> {
        let mut writes = Vec::new();
        let mut award = None;
        let mut updated = order.clone();
        updated.status = next;

        match next {
            OrderStatus::PaymentConfirmed => updated.paid_at = Some(now),
            OrderStatus::Posted => updated.posted_at = Some(now),
            OrderStatus::Completed => {
                updated.completed_at = Some(now);

                let mut client = self
                    .store
                    .get_client(&order.client_id)
                    .await?
                    .ok_or_else(|| OrderError::ClientNotFound(order.client_id.clone()))?;
                client
                    .record_completed_order(order.final_price)
                    .ok_or_else(|| OrderError::CounterOverflow(order.id.clone()))?;
                writes.push(Write::UpdateClient(client));

                if let Some(manager_id) = &order.manager_id {
                    let manager = self
                        .store
                        .get_manager(manager_id)
                        .await?
                        .ok_or_else(|| OrderError::ManagerNotFound(manager_id.clone()))?;
                    let (manager, sale) = self.progression.apply_sale(&manager, order.final_price)?;
                    writes.push(Write::UpdateManager(manager));
                    award = Some(sale);
                }
            }
            OrderStatus::Cancelled => {
                updated.cancelled_at = Some(now);
                if order.status.releases_slot_on_cancel() {
                    let slot = self.load_slot(&order.slot_id).await?;
                    match decide_unbook(slot, &order.client_id) {
                        Ok(Decision::Commit(released)) => writes.push(Write::UpdateSlot(released)),
                        Ok(Decision::Unchanged(_)) => {}
                        Err(e) => {
                            warn!(order_id = %order.id, error = %e, "Slot not released on cancellation");
                        }
                    }
                }
            }
            _ => {}
        }

        writes.push(Write::UpdateOrder(updated.clone()));
        Ok((updated, writes, award))
    }

    async fn load_slot(&self, slot_id: &str) -> Result<Slot, OrderError> {
        self.store
            .get_slot(slot_id)
            .await?
            .ok_or_else(|| OrderError::SlotNotFound(slot_id.to_string()))
    }

    fn map_ledger_error(&self, error: LedgerError, request: &NewOrder) -> OrderError {
        match error {
            LedgerError::NotFound(slot_id) => OrderError::SlotNotFound(slot_id),
            LedgerError::Storage(e) => OrderError::Storage(e),
            other => {
                debug!(error = %other, "Slot could not be confirmed for order");
                OrderError::SlotNotHeldByClient {
                    slot_id: request.slot_id.clone(),
                    client_id: request.client_id.clone(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::{Channel, Client, Manager, ManagerStatus, SlotStatus};
    use crate::posting::{LoggingPostScheduler, PostingError};
    use crate::progression::ProgressionConfig;
    use crate::store::InMemoryStore;
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate, NaiveTime, TimeZone};
    use parking_lot::Mutex;

    #[derive(Debug, Default)]
    struct RecordingScheduler {
        posted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PostScheduler for RecordingScheduler {
        async fn schedule_post(&self, order: &Order) -> Result<(), PostingError> {
            self.posted.lock().push(order.id.clone());
            Err(PostingError::Schedule {
                order_id: order.id.clone(),
                message: "publisher offline".into(),
            })
        }
    }

    struct Fixture {
        store: Arc<InMemoryStore>,
        ledger: SlotLedger,
        orders: OrderWorkflow,
        client: Client,
        manager: Manager,
        slot: Slot,
    }

    async fn fixture_with(posting: Arc<dyn PostScheduler>) -> Fixture {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap(),
        ));
        let store = Arc::new(InMemoryStore::new());

        let mut channel = Channel::new("-100200", "Daily News", "news", clock.now());
        channel.prices.top1_feed24 = Some(10_000);
        let client = Client::new(42, "Buyer", clock.now());
        let mut manager = Manager::new(7, "Ann", 10, clock.now());
        manager.status = ManagerStatus::Active;
        let slot = Slot::new(
            &channel.id,
            NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            clock.now(),
        );
        store
            .commit(vec![
                Write::InsertChannel(channel),
                Write::InsertClient(client.clone()),
                Write::InsertManager(manager.clone()),
                Write::InsertSlot(slot.clone()),
            ])
            .await
            .unwrap();

        let ledger = SlotLedger::new(store.clone(), clock.clone());
        let progression = ProgressionEngine::new(
            store.clone(),
            clock.clone(),
            Arc::new(ProgressionConfig::default()),
        );
        let orders = OrderWorkflow::new(store.clone(), clock, ledger.clone(), progression, posting);
        Fixture {
            store,
            ledger,
            orders,
            client,
            manager,
            slot,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(Arc::new(LoggingPostScheduler)).await
    }

    impl Fixture {
        fn new_order(&self, discount_percent: u8) -> NewOrder {
            NewOrder {
                slot_id: self.slot.id.clone(),
                client_id: self.client.id.clone(),
                manager_id: Some(self.manager.id.clone()),
                format: PlacementFormat::Top1Feed24,
                discount_percent,
            }
        }

        async fn placed_order(&self, discount_percent: u8) -> Order {
            self.ledger
                .reserve(&self.slot.id, &self.client.id, Duration::seconds(300))
                .await
                .unwrap();
            self.orders
                .create_order(self.new_order(discount_percent))
                .await
                .unwrap()
        }

        async fn advance(&self, order_id: &str, path: &[OrderStatus]) {
            for status in path {
                self.orders.transition(order_id, *status).await.unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_create_order_books_slot_and_freezes_price() {
        let f = fixture().await;
        let order = f.placed_order(15).await;
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.base_price, 10_000);
        assert_eq!(order.final_price, 8_500);

        let slot = f.ledger.get(&f.slot.id).await.unwrap();
        assert_eq!(slot.status, SlotStatus::Booked);
        assert_eq!(slot.holder_id.as_deref(), Some(f.client.id.as_str()));
    }

    #[tokio::test]
    async fn test_create_order_requires_hold() {
        let f = fixture().await;
        let err = f.orders.create_order(f.new_order(0)).await.unwrap_err();
        assert!(matches!(err, OrderError::SlotNotHeldByClient { .. }));

        f.ledger
            .reserve(&f.slot.id, "someone-else", Duration::seconds(300))
            .await
            .unwrap();
        let err = f.orders.create_order(f.new_order(0)).await.unwrap_err();
        assert!(matches!(err, OrderError::SlotNotHeldByClient { .. }));
    }

    #[tokio::test]
    async fn test_create_order_validation() {
        let f = fixture().await;
        let err = f.orders.create_order(f.new_order(101)).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidDiscount(101)));

        let mut request = f.new_order(0);
        request.client_id = "missing".into();
        assert!(matches!(
            f.orders.create_order(request).await,
            Err(OrderError::ClientNotFound(_))
        ));

        f.ledger
            .reserve(&f.slot.id, &f.client.id, Duration::seconds(300))
            .await
            .unwrap();
        let mut request = f.new_order(0);
        request.format = PlacementFormat::Native;
        assert!(matches!(
            f.orders.create_order(request).await,
            Err(OrderError::PriceNotConfigured { .. })
        ));
    }

    #[tokio::test]
    async fn test_second_order_on_slot_refused() {
        let f = fixture().await;
        f.placed_order(0).await;
        let err = f.orders.create_order(f.new_order(0)).await.unwrap_err();
        assert!(matches!(err, OrderError::SlotAlreadyOrdered(_)));
    }

    #[tokio::test]
    async fn test_completion_updates_client_and_manager_once() {
        let f = fixture().await;
        let order = f.placed_order(0).await;
        f.advance(
            &order.id,
            &[
                OrderStatus::PaymentUploaded,
                OrderStatus::PaymentConfirmed,
                OrderStatus::Posted,
            ],
        )
        .await;

        let done = f.orders.transition(&order.id, OrderStatus::Completed).await.unwrap();
        assert!(done.changed);
        assert!(done.order.completed_at.is_some());
        let award = done.award.unwrap();
        assert_eq!(award.xp_gained, 110);
        assert_eq!(award.commission_earned, 1_000);

        let again = f.orders.transition(&order.id, OrderStatus::Completed).await.unwrap();
        assert!(!again.changed);
        assert!(again.award.is_none());

        let client = f.store.get_client(&f.client.id).await.unwrap().unwrap();
        assert_eq!((client.total_orders, client.total_spent), (1, 10_000));
        let manager = f.store.get_manager(&f.manager.id).await.unwrap().unwrap();
        assert_eq!(manager.total_sales, 1);
        assert_eq!(manager.total_revenue, 10_000);
        assert_eq!(manager.experience_points, 110);
        assert_eq!(manager.balance, 1_000);
    }

    #[tokio::test]
    async fn test_timestamps_stamped_on_entry() {
        let f = fixture().await;
        let order = f.placed_order(0).await;
        f.advance(&order.id, &[OrderStatus::PaymentUploaded, OrderStatus::Moderation])
            .await;
        let paid = f
            .orders
            .transition(&order.id, OrderStatus::PaymentConfirmed)
            .await
            .unwrap();
        assert!(paid.order.paid_at.is_some());
        assert!(paid.order.posted_at.is_none());
    }

    #[tokio::test]
    async fn test_illegal_transitions_rejected() {
        let f = fixture().await;
        let order = f.placed_order(0).await;

        let err = f.orders.transition(&order.id, OrderStatus::Posted).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Posted
            }
        ));

        f.advance(
            &order.id,
            &[
                OrderStatus::PaymentUploaded,
                OrderStatus::Moderation,
                OrderStatus::Rejected,
            ],
        )
        .await;
        let err = f
            .orders
            .transition(&order.id, OrderStatus::PaymentConfirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_early_cancellation_releases_slot() {
        let f = fixture().await;
        let order = f.placed_order(0).await;
        f.advance(&order.id, &[OrderStatus::PaymentUploaded]).await;

        let cancelled = f.orders.transition(&order.id, OrderStatus::Cancelled).await.unwrap();
        assert!(cancelled.order.cancelled_at.is_some());
        let slot = f.ledger.get(&f.slot.id).await.unwrap();
        assert_eq!(slot.status, SlotStatus::Available);

        let err = f
            .orders
            .transition(&order.id, OrderStatus::PaymentUploaded)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_late_cancellation_keeps_booking() {
        let f = fixture().await;
        let order = f.placed_order(0).await;
        f.advance(
            &order.id,
            &[OrderStatus::PaymentUploaded, OrderStatus::PaymentConfirmed],
        )
        .await;

        f.orders.transition(&order.id, OrderStatus::Cancelled).await.unwrap();
        let slot = f.ledger.get(&f.slot.id).await.unwrap();
        assert_eq!(slot.status, SlotStatus::Booked);
    }

    #[tokio::test]
    async fn test_post_scheduler_failure_is_not_fatal() {
        let scheduler = Arc::new(RecordingScheduler::default());
        let f = fixture_with(scheduler.clone()).await;
        let order = f.placed_order(0).await;
        f.advance(
            &order.id,
            &[OrderStatus::PaymentUploaded, OrderStatus::PaymentConfirmed],
        )
        .await;

        let posted = f.orders.transition(&order.id, OrderStatus::Posted).await.unwrap();
        assert_eq!(posted.order.status, OrderStatus::Posted);
        assert!(posted.order.posted_at.is_some());
        assert_eq!(scheduler.posted.lock().as_slice(), [order.id.clone()]);
    }
}
