//! Manager progression: experience, levels, commission and leaderboards.
//!
//! A completed sale of `amount` grants `10 + amount / 100` XP. The level is a
//! pure function of accumulated XP over [`ProgressionConfig`] and only ever
//! rises; crossing into a new level overwrites the manager's commission rate
//! with that level's rate.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::clock::Clock;
use crate::ledger::MAX_CAS_ATTEMPTS;
use crate::model::{Competition, LeaderboardMetric, Manager};
use crate::store::{BookingStore, StoreError, Write};

pub const SALES_MILESTONES: [i64; 5] = [5, 10, 25, 50, 100];
pub const REVENUE_MILESTONES: [i64; 4] = [10_000, 50_000, 100_000, 500_000];

#[derive(Debug, thiserror::Error)]
pub enum ProgressionError {
    #[error("Manager not found: {0}")]
    ManagerNotFound(String),

    #[error("Sale amount must not be negative: {0}")]
    InvalidAmount(i64),

    #[error("Sale of {amount} would overflow the counters of manager {manager_id}")]
    CounterOverflow { manager_id: String, amount: i64 },

    #[error("Invalid level table: {0}")]
    InvalidConfig(String),

    #[error("Manager {0} is too contended to update")]
    Contended(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

pub fn xp_for_sale(amount: i64) -> i64 {
    10 + amount / 100
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSpec {
    pub level: u8,
    pub name: String,
    pub min_xp: i64,
    /// Commission in percent of the order's final price
    pub commission_rate: u32,
}

impl LevelSpec {
    fn new(level: u8, name: &str, min_xp: i64, commission_rate: u32) -> Self {
        Self {
            level,
            name: name.to_string(),
            min_xp,
            commission_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionConfig {
    pub levels: Vec<LevelSpec>,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            levels: vec![
                LevelSpec::new(1, "Novice", 0, 10),
                LevelSpec::new(2, "Seller", 200, 12),
                LevelSpec::new(3, "Pro", 800, 15),
                LevelSpec::new(4, "Expert", 2000, 18),
                LevelSpec::new(5, "Master", 5000, 20),
            ],
        }
    }
}

impl ProgressionConfig {
    /// Levels must be numbered 1..=n with strictly rising thresholds from 0
    pub fn validate(&self) -> Result<(), ProgressionError> {
        if self.levels.is_empty() {
            return Err(ProgressionError::InvalidConfig("no levels defined".into()));
        }
        for (i, spec) in self.levels.iter().enumerate() {
            if usize::from(spec.level) != i + 1 {
                return Err(ProgressionError::InvalidConfig(format!(
                    "level {} out of sequence at position {}",
                    spec.level,
                    i + 1
                )));
            }
            if spec.commission_rate > 100 {
                return Err(ProgressionError::InvalidConfig(format!(
                    "commission rate {} of level {} exceeds 100",
                    spec.commission_rate, spec.level
                )));
            }
        }
        if self.levels[0].min_xp != 0 {
            return Err(ProgressionError::InvalidConfig(
                "level 1 must start at 0 xp".into(),
            ));
        }
        if self.levels.windows(2).any(|w| w[1].min_xp <= w[0].min_xp) {
            return Err(ProgressionError::InvalidConfig(
                "xp thresholds must strictly increase".into(),
            ));
        }
        Ok(())
    }

    pub fn level_for(&self, xp: i64) -> u8 {
        self.levels
            .iter()
            .rev()
            .find(|spec| xp >= spec.min_xp)
            .map(|spec| spec.level)
            .unwrap_or(1)
    }

    pub fn spec(&self, level: u8) -> Option<&LevelSpec> {
        self.levels.iter().find(|spec| spec.level == level)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Achievement {
    FirstSale,
    SalesMilestone { count: i64 },
    RevenueMilestone { threshold: i64 },
}

/// Achievements unlocked by the sale that brought `manager` to its counters
pub fn detect_achievements(manager: &Manager, amount: i64) -> Vec<Achievement> {
    let mut unlocked = Vec::new();
    if manager.total_sales == 1 {
        unlocked.push(Achievement::FirstSale);
    }
    if SALES_MILESTONES.contains(&manager.total_sales) {
        unlocked.push(Achievement::SalesMilestone {
            count: manager.total_sales,
        });
    }
    let before = manager.total_revenue - amount;
    unlocked.extend(
        REVENUE_MILESTONES
            .iter()
            .filter(|&&t| before < t && t <= manager.total_revenue)
            .map(|&threshold| Achievement::RevenueMilestone { threshold }),
    );
    unlocked
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleAward {
    pub manager_id: String,
    pub xp_gained: i64,
    pub level_up: bool,
    pub new_level: Option<u8>,
    pub level_name: Option<String>,
    pub commission_earned: i64,
    pub achievements: Vec<Achievement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub manager_id: String,
    pub name: String,
    pub level: u8,
    pub value: i64,
}

pub fn metric_value(manager: &Manager, metric: LeaderboardMetric) -> i64 {
    match metric {
        LeaderboardMetric::Sales => manager.total_sales,
        LeaderboardMetric::Revenue => manager.total_revenue,
        LeaderboardMetric::Xp => manager.experience_points,
    }
}

/// Descending by value; ties keep input order. Ranks start at 1.
pub fn rank(rows: Vec<(&Manager, i64)>, limit: usize) -> Vec<LeaderboardEntry> {
    let mut rows = rows;
    rows.sort_by(|a, b| b.1.cmp(&a.1));
    rows.into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (manager, value))| LeaderboardEntry {
            rank: i + 1,
            manager_id: manager.id.clone(),
            name: manager.name.clone(),
            level: manager.level,
            value,
        })
        .collect()
}

/// First and last calendar day of the month containing `day`
pub fn month_bounds(day: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let first = day.with_day(1)?;
    let last = first.checked_add_months(Months::new(1))?.pred_opt()?;
    Some((first, last))
}

#[derive(Debug, Clone)]
pub struct ProgressionEngine {
    store: Arc<dyn BookingStore>,
    clock: Arc<dyn Clock>,
    config: Arc<ProgressionConfig>,
}

impl ProgressionEngine {
    pub fn new(
        store: Arc<dyn BookingStore>,
        clock: Arc<dyn Clock>,
        config: Arc<ProgressionConfig>,
    ) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &ProgressionConfig {
        &self.config
    }

    /// Next manager state after a sale, without touching the store
    pub fn apply_sale(
        &self,
        manager: &Manager,
        amount: i64,
    ) -> Result<(Manager, SaleAward), ProgressionError> {
        if amount < 0 {
            return Err(ProgressionError::InvalidAmount(amount));
        }

        let overflow = || ProgressionError::CounterOverflow {
            manager_id: manager.id.clone(),
            amount,
        };
        let xp_gained = xp_for_sale(amount);
        let commission_earned =
            i64::try_from(i128::from(amount) * i128::from(manager.commission_rate) / 100)
                .map_err(|_| overflow())?;

        let mut next = manager.clone();
        next.experience_points = manager
            .experience_points
            .checked_add(xp_gained)
            .ok_or_else(overflow)?;
        next.total_sales = manager.total_sales.checked_add(1).ok_or_else(overflow)?;
        next.total_revenue = manager
            .total_revenue
            .checked_add(amount)
            .ok_or_else(overflow)?;
        next.balance = manager
            .balance
            .checked_add(commission_earned)
            .ok_or_else(overflow)?;
        next.total_earned = manager
            .total_earned
            .checked_add(commission_earned)
            .ok_or_else(overflow)?;

        let derived = self.config.level_for(next.experience_points);
        let level_up = derived > manager.level;
        let mut level_name = None;
        if level_up {
            next.level = derived;
            if let Some(spec) = self.config.spec(derived) {
                next.commission_rate = spec.commission_rate;
                level_name = Some(spec.name.clone());
            }
        }

        let award = SaleAward {
            manager_id: manager.id.clone(),
            xp_gained,
            level_up,
            new_level: level_up.then_some(derived),
            level_name,
            commission_earned,
            achievements: detect_achievements(&next, amount),
        };
        Ok((next, award))
    }

    #[instrument(name = "progression.award_sale", skip(self))]
    pub async fn award_sale(
        &self,
        manager_id: &str,
        amount: i64,
    ) -> Result<SaleAward, ProgressionError> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let manager = self
                .store
                .get_manager(manager_id)
                .await?
                .ok_or_else(|| ProgressionError::ManagerNotFound(manager_id.to_string()))?;
            let (next, award) = self.apply_sale(&manager, amount)?;

            match self.store.commit(vec![Write::UpdateManager(next)]).await {
                Ok(()) => {
                    info!(
                        manager_id,
                        xp = award.xp_gained,
                        level_up = award.level_up,
                        "Sale awarded"
                    );
                    return Ok(award);
                }
                Err(e) if e.is_conflict() => {
                    debug!(manager_id, attempt, "Manager changed concurrently, retrying award");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ProgressionError::Contended(manager_id.to_string()))
    }

    pub async fn get_leaderboard(
        &self,
        metric: &str,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, ProgressionError> {
        self.leaderboard(LeaderboardMetric::parse_or_default(metric), limit)
            .await
    }

    /// Active managers ranked by `metric`, ties in creation order
    pub async fn leaderboard(
        &self,
        metric: LeaderboardMetric,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, ProgressionError> {
        let managers = self.store.list_managers().await?;
        let rows = managers
            .iter()
            .filter(|m| m.is_active())
            .map(|m| (m, metric_value(m, metric)))
            .collect();
        Ok(rank(rows, limit))
    }

    /// Opens a sales competition spanning the current calendar month
    #[instrument(name = "progression.create_period_competition", skip(self))]
    pub async fn create_period_competition(&self) -> Result<Competition, ProgressionError> {
        let now = self.clock.now();
        let (start, end) = month_bounds(now.date_naive()).ok_or_else(|| {
            ProgressionError::InvalidConfig(format!("no month bounds for {}", now))
        })?;
        let competition = Competition::new(
            format!("Sales competition {}", start.format("%B %Y")),
            start,
            end,
            LeaderboardMetric::Sales,
            now,
        );
        self.store
            .commit(vec![Write::InsertCompetition(competition.clone())])
            .await?;
        info!(competition_id = %competition.id, %start, %end, "Competition opened");
        Ok(competition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::ManagerStatus;
    use crate::store::InMemoryStore;
    use chrono::{TimeZone, Utc};

    fn engine() -> (ProgressionEngine, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 2, 14, 10, 0, 0).unwrap(),
        ));
        let engine =
            ProgressionEngine::new(store.clone(), clock, Arc::new(ProgressionConfig::default()));
        (engine, store)
    }

    fn manager() -> Manager {
        Manager::new(7, "Ann", 10, Utc::now())
    }

    #[test]
    fn test_xp_formula() {
        assert_eq!(xp_for_sale(0), 10);
        assert_eq!(xp_for_sale(99), 10);
        assert_eq!(xp_for_sale(250), 12);
        assert_eq!(xp_for_sale(10_000), 110);
    }

    #[test]
    fn test_large_sale_is_awarded_without_overflow() {
        let (engine, _) = engine();
        let amount = i64::MAX / 5;
        let (next, award) = engine.apply_sale(&manager(), amount).unwrap();
        assert_eq!(award.commission_earned, amount / 10);
        assert_eq!(next.total_revenue, amount);
        assert_eq!(next.balance, amount / 10);
    }

    #[tokio::test]
    async fn test_overflowing_sale_is_refused() {
        let (engine, store) = engine();
        let mut near_limit = manager();
        near_limit.total_revenue = i64::MAX - 50;
        store
            .commit(vec![Write::InsertManager(near_limit.clone())])
            .await
            .unwrap();

        let err = engine.apply_sale(&near_limit, 100).unwrap_err();
        assert!(matches!(err, ProgressionError::CounterOverflow { amount: 100, .. }));

        let err = engine.award_sale(&near_limit.id, 100).await.unwrap_err();
        assert!(matches!(err, ProgressionError::CounterOverflow { .. }));

        let stored = store.get_manager(&near_limit.id).await.unwrap().unwrap();
        assert_eq!(stored.total_revenue, i64::MAX - 50);
        assert_eq!(stored.total_sales, 0);
        assert_eq!(stored.version, 0);
    }

    #[test]
    fn test_level_thresholds() {
        let config = ProgressionConfig::default();
        assert_eq!(config.level_for(0), 1);
        assert_eq!(config.level_for(199), 1);
        assert_eq!(config.level_for(200), 2);
        assert_eq!(config.level_for(799), 2);
        assert_eq!(config.level_for(800), 3);
        assert_eq!(config.level_for(2000), 4);
        assert_eq!(config.level_for(5000), 5);
        assert_eq!(config.level_for(1_000_000), 5);
        config.validate().unwrap();
    }

    #[test]
    fn test_config_validation() {
        let mut config = ProgressionConfig::default();
        config.levels[2].min_xp = 100;
        assert!(config.validate().is_err());

        let mut config = ProgressionConfig::default();
        config.levels.remove(1);
        assert!(config.validate().is_err());

        let config = ProgressionConfig { levels: Vec::new() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_level_up_overwrites_commission() {
        let (engine, _) = engine();
        let mut manager = manager();
        manager.experience_points = 190;

        let (next, award) = engine.apply_sale(&manager, 0).unwrap();
        assert_eq!(next.experience_points, 200);
        assert_eq!(next.level, 2);
        assert_eq!(next.commission_rate, 12);
        assert!(award.level_up);
        assert_eq!(award.new_level, Some(2));
        assert_eq!(award.level_name.as_deref(), Some("Seller"));
    }

    #[test]
    fn test_commission_uses_rate_before_sale() {
        let (engine, _) = engine();
        let mut manager = manager();
        manager.experience_points = 150;

        let (next, award) = engine.apply_sale(&manager, 10_000).unwrap();
        assert_eq!(next.level, 2);
        assert_eq!(award.commission_earned, 1_000);
        assert_eq!(next.balance, 1_000);
        assert_eq!(next.total_earned, 1_000);
    }

    #[test]
    fn test_level_never_decreases() {
        let (engine, _) = engine();
        let mut manager = manager();
        manager.level = 3;
        manager.commission_rate = 15;

        let (next, award) = engine.apply_sale(&manager, 100).unwrap();
        assert_eq!(next.level, 3);
        assert_eq!(next.commission_rate, 15);
        assert!(!award.level_up);
        assert_eq!(award.new_level, None);
    }

    #[test]
    fn test_achievements() {
        let mut manager = manager();
        manager.total_sales = 1;
        manager.total_revenue = 12_000;
        assert_eq!(
            detect_achievements(&manager, 12_000),
            vec![
                Achievement::FirstSale,
                Achievement::RevenueMilestone { threshold: 10_000 }
            ]
        );

        manager.total_sales = 5;
        manager.total_revenue = 60_000;
        assert_eq!(
            detect_achievements(&manager, 5_000),
            vec![Achievement::SalesMilestone { count: 5 }]
        );

        manager.total_sales = 6;
        manager.total_revenue = 110_000;
        assert_eq!(
            detect_achievements(&manager, 100_000),
            vec![
                Achievement::RevenueMilestone { threshold: 50_000 },
                Achievement::RevenueMilestone { threshold: 100_000 }
            ]
        );
    }

    #[test]
    fn test_negative_amount_rejected() {
        let (engine, _) = engine();
        assert!(matches!(
            engine.apply_sale(&manager(), -1),
            Err(ProgressionError::InvalidAmount(-1))
        ));
    }

    #[tokio::test]
    async fn test_award_sale_persists() {
        let (engine, store) = engine();
        let manager = manager();
        store
            .commit(vec![Write::InsertManager(manager.clone())])
            .await
            .unwrap();

        let award = engine.award_sale(&manager.id, 250).await.unwrap();
        assert_eq!(award.xp_gained, 12);
        assert_eq!(award.achievements, vec![Achievement::FirstSale]);

        let stored = store.get_manager(&manager.id).await.unwrap().unwrap();
        assert_eq!(stored.experience_points, 12);
        assert_eq!(stored.total_sales, 1);
        assert_eq!(stored.total_revenue, 250);
        assert_eq!(stored.version, 1);

        assert!(matches!(
            engine.award_sale("missing", 100).await,
            Err(ProgressionError::ManagerNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_leaderboard_ranks_active_managers() {
        let (engine, store) = engine();
        let now = Utc::now();
        let mut writes = Vec::new();
        for (i, sales) in [3, 10, 1].into_iter().enumerate() {
            let mut m = Manager::new(i as i64, format!("m{i}"), 10, now);
            m.status = ManagerStatus::Active;
            m.total_sales = sales;
            writes.push(Write::InsertManager(m));
        }
        let mut trainee = Manager::new(99, "trainee", 10, now);
        trainee.total_sales = 50;
        writes.push(Write::InsertManager(trainee));
        store.commit(writes).await.unwrap();

        let board = engine.get_leaderboard("sales", 2).await.unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!((board[0].rank, board[0].value), (1, 10));
        assert_eq!((board[1].rank, board[1].value), (2, 3));

        let fallback = engine.get_leaderboard("karma", 10).await.unwrap();
        assert_eq!(fallback.iter().map(|e| e.value).collect::<Vec<_>>(), vec![10, 3, 1]);
    }

    #[tokio::test]
    async fn test_ties_keep_creation_order() {
        let (engine, store) = engine();
        let now = Utc::now();
        let mut writes = Vec::new();
        for name in ["early", "late"] {
            let mut m = Manager::new(1, name, 10, now);
            m.status = ManagerStatus::Active;
            m.total_revenue = 500;
            writes.push(Write::InsertManager(m));
        }
        store.commit(writes).await.unwrap();

        let board = engine.get_leaderboard("revenue", 10).await.unwrap();
        assert_eq!(board[0].name, "early");
        assert_eq!(board[1].name, "late");
    }

    #[tokio::test]
    async fn test_period_competition_spans_month() {
        let (engine, _) = engine();
        let competition = engine.create_period_competition().await.unwrap();
        assert_eq!(competition.start_date, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
        assert_eq!(competition.end_date, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
        assert_eq!(competition.metric, LeaderboardMetric::Sales);
    }
}
