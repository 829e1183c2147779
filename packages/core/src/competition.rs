//! Read-only standings over a competition's date window

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::model::{Competition, CompetitionStatus, LeaderboardMetric, Order};
use crate::progression::{LeaderboardEntry, rank, xp_for_sale};
use crate::store::{BookingStore, StoreError, Versioned, Write};

#[derive(Debug, thiserror::Error)]
pub enum CompetitionError {
    #[error("Competition not found: {0}")]
    NotFound(String),

    #[error("Competition {0} has an invalid date window")]
    InvalidWindow(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Standings {
    pub competition: Competition,
    pub entries: Vec<LeaderboardEntry>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct WindowTotals {
    sales: i64,
    revenue: i64,
    xp: i64,
}

impl WindowTotals {
    fn value(&self, metric: LeaderboardMetric) -> i64 {
        match metric {
            LeaderboardMetric::Sales => self.sales,
            LeaderboardMetric::Revenue => self.revenue,
            LeaderboardMetric::Xp => self.xp,
        }
    }
}

fn totals_by_manager(orders: &[Order]) -> HashMap<&str, WindowTotals> {
    let mut totals: HashMap<&str, WindowTotals> = HashMap::new();
    for order in orders {
        let Some(manager_id) = order.manager_id.as_deref() else {
            continue;
        };
        let entry = totals.entry(manager_id).or_default();
        entry.sales += 1;
        entry.revenue += order.final_price;
        entry.xp += xp_for_sale(order.final_price);
    }
    totals
}

/// `[start 00:00, end + 1 day 00:00)` in UTC
fn window(start: NaiveDate, end: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    if end < start {
        return None;
    }
    let from = start.and_hms_opt(0, 0, 0)?.and_utc();
    let to = end.checked_add_days(Days::new(1))?.and_hms_opt(0, 0, 0)?.and_utc();
    Some((from, to))
}

#[derive(Debug, Clone)]
pub struct CompetitionTracker {
    store: Arc<dyn BookingStore>,
}

impl CompetitionTracker {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, competition_id: &str) -> Result<Competition, CompetitionError> {
        self.store
            .get_competition(competition_id)
            .await?
            .ok_or_else(|| CompetitionError::NotFound(competition_id.to_string()))
    }

    /// Managers ranked by what they sold inside the window. Active managers
    /// without a sale in the window trail with a value of zero.
    #[instrument(name = "competition.standings", skip(self))]
    pub async fn standings(
        &self,
        competition_id: &str,
        limit: usize,
    ) -> Result<Standings, CompetitionError> {
        let competition = self.get(competition_id).await?;
        let (from, to) = window(competition.start_date, competition.end_date)
            .ok_or_else(|| CompetitionError::InvalidWindow(competition.id.clone()))?;

        let orders = self.store.list_completed_orders(from, to).await?;
        let totals = totals_by_manager(&orders);
        let managers = self.store.list_managers().await?;

        let rows = managers
            .iter()
            .filter_map(|m| match totals.get(m.id.as_str()) {
                Some(t) => Some((m, t.value(competition.metric))),
                None if m.is_active() => Some((m, 0)),
                None => None,
            })
            .collect();

        Ok(Standings {
            entries: rank(rows, limit),
            competition,
        })
    }

    #[instrument(name = "competition.finish", skip(self))]
    pub async fn finish(&self, competition_id: &str) -> Result<Competition, CompetitionError> {
        let competition = self.get(competition_id).await?;
        if competition.status == CompetitionStatus::Finished {
            return Ok(competition);
        }

        let mut finished = competition;
        finished.status = CompetitionStatus::Finished;
        self.store
            .commit(vec![Write::UpdateCompetition(finished.clone())])
            .await?;
        finished.bump();
        info!(competition_id, "Competition finished");
        Ok(finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Manager, ManagerStatus, OrderStatus, PlacementFormat};
    use crate::store::InMemoryStore;
    use chrono::TimeZone;

    fn completed_order(manager_id: &str, price: i64, at: DateTime<Utc>) -> Order {
        let mut order = Order::new(
            crate::create_id(),
            "client",
            Some(manager_id.to_string()),
            PlacementFormat::Top1Feed24,
            price,
            0,
            at,
        );
        order.status = OrderStatus::Completed;
        order.completed_at = Some(at);
        order
    }

    fn active(name: &str) -> Manager {
        let mut m = Manager::new(1, name, 10, Utc::now());
        m.status = ManagerStatus::Active;
        m
    }

    #[tokio::test]
    async fn test_standings_only_count_window() {
        let store = Arc::new(InMemoryStore::new());
        let ann = active("ann");
        let bob = active("bob");
        let idle = active("idle");
        let mut gone = Manager::new(2, "gone", 10, Utc::now());
        gone.status = ManagerStatus::Inactive;

        let competition = Competition::new(
            "October",
            NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 31).unwrap(),
            LeaderboardMetric::Revenue,
            Utc::now(),
        );

        let inside = Utc.with_ymd_and_hms(2026, 10, 31, 23, 59, 59).unwrap();
        let before = Utc.with_ymd_and_hms(2026, 9, 30, 23, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap();

        store
            .commit(vec![
                Write::InsertManager(ann.clone()),
                Write::InsertManager(bob.clone()),
                Write::InsertManager(idle.clone()),
                Write::InsertManager(gone.clone()),
                Write::InsertCompetition(competition.clone()),
                Write::InsertOrder(completed_order(&ann.id, 1_000, inside)),
                Write::InsertOrder(completed_order(&bob.id, 5_000, inside)),
                Write::InsertOrder(completed_order(&bob.id, 9_000, before)),
                Write::InsertOrder(completed_order(&ann.id, 9_000, after)),
                Write::InsertOrder(completed_order(&gone.id, 300, inside)),
            ])
            .await
            .unwrap();

        let tracker = CompetitionTracker::new(store);
        let standings = tracker.standings(&competition.id, 10).await.unwrap();
        let table: Vec<(&str, i64)> = standings
            .entries
            .iter()
            .map(|e| (e.name.as_str(), e.value))
            .collect();
        assert_eq!(
            table,
            vec![("bob", 5_000), ("ann", 1_000), ("gone", 300), ("idle", 0)]
        );
        assert_eq!(standings.entries[3].rank, 4);
    }

    #[tokio::test]
    async fn test_finish_is_idempotent() {
        let store = Arc::new(InMemoryStore::new());
        let competition = Competition::new(
            "October",
            NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 31).unwrap(),
            LeaderboardMetric::Sales,
            Utc::now(),
        );
        store
            .commit(vec![Write::InsertCompetition(competition.clone())])
            .await
            .unwrap();

        let tracker = CompetitionTracker::new(store);
        let finished = tracker.finish(&competition.id).await.unwrap();
        assert_eq!(finished.status, CompetitionStatus::Finished);
        let again = tracker.finish(&competition.id).await.unwrap();
        assert_eq!(again.version, finished.version);

        assert!(matches!(
            tracker.finish("missing").await,
            Err(CompetitionError::NotFound(_))
        ));
    }
}
