use std::sync::Arc;

use crate::clock::Clock;
use crate::competition::CompetitionTracker;
use crate::config::AppConfig;
use crate::directory::Directory;
use crate::ledger::SlotLedger;
use crate::orders::OrderWorkflow;
use crate::payouts::PayoutDesk;
use crate::posting::PostScheduler;
use crate::pricing::CategoryCpm;
use crate::progression::ProgressionEngine;
use crate::store::BookingStore;

/// The booking services wired over one store and one clock
#[derive(Debug, Clone)]
pub struct Services {
    pub store: Arc<dyn BookingStore>,
    pub categories: Arc<CategoryCpm>,
    pub directory: Directory,
    pub ledger: SlotLedger,
    pub orders: OrderWorkflow,
    pub progression: ProgressionEngine,
    pub competitions: CompetitionTracker,
    pub payouts: PayoutDesk,
}

impl Services {
    pub fn new(
        store: Arc<dyn BookingStore>,
        clock: Arc<dyn Clock>,
        config: AppConfig,
        posting: Arc<dyn PostScheduler>,
    ) -> Self {
        let levels = Arc::new(config.progression);
        let ledger = SlotLedger::new(store.clone(), clock.clone());
        let directory = Directory::new(store.clone(), clock.clone(), levels.clone());
        let progression = ProgressionEngine::new(store.clone(), clock.clone(), levels);
        let orders = OrderWorkflow::new(
            store.clone(),
            clock.clone(),
            ledger.clone(),
            progression.clone(),
            posting,
        );

        Self {
            categories: Arc::new(config.pricing.categories),
            competitions: CompetitionTracker::new(store.clone()),
            payouts: PayoutDesk::new(store.clone(), clock),
            store,
            directory,
            ledger,
            orders,
            progression,
        }
    }
}
