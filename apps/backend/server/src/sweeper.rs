//! Periodic maintenance of the slot ledger
//!
//! Expired holds are also treated as available on read, so the sweeper only
//! keeps stored state tidy. A failed pass is logged and retried next tick.

use std::time::Duration;

use adslot::ledger::SlotLedger;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub reclaimed: u64,
    pub expired: u64,
}

pub async fn sweep_once(ledger: &SlotLedger) -> SweepReport {
    let mut report = SweepReport::default();

    match ledger.reclaim_expired().await {
        Ok(count) => report.reclaimed = count,
        Err(e) => tracing::error!(error = %e, "Failed to reclaim expired reservations"),
    }
    match ledger.expire_past_slots().await {
        Ok(count) => report.expired = count,
        Err(e) => tracing::error!(error = %e, "Failed to expire past slots"),
    }

    if report != SweepReport::default() {
        tracing::info!(
            reclaimed = report.reclaimed,
            expired = report.expired,
            "Slot sweep finished"
        );
    }
    report
}

pub async fn run(ledger: SlotLedger, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(interval_secs = interval.as_secs(), "Slot sweeper started");

    loop {
        ticker.tick().await;
        sweep_once(&ledger).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adslot::clock::ManualClock;
    use adslot::model::Channel;
    use adslot::store::{BookingStore, InMemoryStore, Write};
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_sweep_reclaims_and_expires() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap(),
        ));
        let store = Arc::new(InMemoryStore::new());
        let channel = Channel::new("-1001", "Sweep", "news", Utc::now());
        store
            .commit(vec![Write::InsertChannel(channel.clone())])
            .await
            .unwrap();
        let ledger = SlotLedger::new(store.clone(), clock.clone());

        let tomorrow = ledger
            .open_slot(
                &channel.id,
                NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
                NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            )
            .await
            .unwrap();
        ledger
            .reserve(&tomorrow.id, "client", chrono::Duration::seconds(60))
            .await
            .unwrap();
        ledger
            .open_slot(
                &channel.id,
                NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
                NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            )
            .await
            .unwrap();

        clock.advance(chrono::Duration::seconds(61));
        let report = sweep_once(&ledger).await;
        assert_eq!(
            report,
            SweepReport {
                reclaimed: 1,
                expired: 1
            }
        );
        assert_eq!(sweep_once(&ledger).await, SweepReport::default());
    }
}
