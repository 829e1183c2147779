//! Manager withdrawal requests against the commission balance.
//!
//! The balance is only debited on approval, in the same commit that flips the
//! payout, so two approvals can never overdraw it.

use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::clock::Clock;
use crate::ledger::MAX_CAS_ATTEMPTS;
use crate::model::{Manager, ManagerPayout, PayoutStatus};
use crate::store::{BookingStore, StoreError, Versioned, Write};

#[derive(Debug, thiserror::Error)]
pub enum PayoutError {
    #[error("Manager not found: {0}")]
    ManagerNotFound(String),

    #[error("Payout not found: {0}")]
    PayoutNotFound(String),

    #[error("Payout amount must be positive: {0}")]
    InvalidAmount(i64),

    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: i64, available: i64 },

    #[error("Payout {id} is {status}")]
    InvalidStatus { id: String, status: PayoutStatus },

    #[error("Payout {0} is too contended to update")]
    Contended(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct PayoutDesk {
    store: Arc<dyn BookingStore>,
    clock: Arc<dyn Clock>,
}

impl PayoutDesk {
    pub fn new(store: Arc<dyn BookingStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn get(&self, payout_id: &str) -> Result<ManagerPayout, PayoutError> {
        self.store
            .get_payout(payout_id)
            .await?
            .ok_or_else(|| PayoutError::PayoutNotFound(payout_id.to_string()))
    }

    async fn manager(&self, manager_id: &str) -> Result<Manager, PayoutError> {
        self.store
            .get_manager(manager_id)
            .await?
            .ok_or_else(|| PayoutError::ManagerNotFound(manager_id.to_string()))
    }

    #[instrument(name = "payouts.request", skip(self))]
    pub async fn request_payout(
        &self,
        manager_id: &str,
        amount: i64,
    ) -> Result<ManagerPayout, PayoutError> {
        if amount <= 0 {
            return Err(PayoutError::InvalidAmount(amount));
        }
        let manager = self.manager(manager_id).await?;
        if amount > manager.balance {
            return Err(PayoutError::InsufficientBalance {
                requested: amount,
                available: manager.balance,
            });
        }

        let payout = ManagerPayout::new(manager_id, amount, self.clock.now());
        self.store
            .commit(vec![Write::InsertPayout(payout.clone())])
            .await?;
        info!(payout_id = %payout.id, manager_id, amount, "Payout requested");
        Ok(payout)
    }

    /// Debits the manager's balance and marks the payout approved
    #[instrument(name = "payouts.approve", skip(self))]
    pub async fn approve_payout(&self, payout_id: &str) -> Result<ManagerPayout, PayoutError> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let payout = self.get(payout_id).await?;
            if payout.status != PayoutStatus::Pending {
                return Err(PayoutError::InvalidStatus {
                    id: payout.id,
                    status: payout.status,
                });
            }
            let mut manager = self.manager(&payout.manager_id).await?;
            if payout.amount > manager.balance {
                return Err(PayoutError::InsufficientBalance {
                    requested: payout.amount,
                    available: manager.balance,
                });
            }
            manager.balance -= payout.amount;

            let mut approved = payout;
            approved.status = PayoutStatus::Approved;
            approved.processed_at = Some(self.clock.now());

            match self
                .store
                .commit(vec![
                    Write::UpdateManager(manager),
                    Write::UpdatePayout(approved.clone()),
                ])
                .await
            {
                Ok(()) => {
                    approved.bump();
                    info!(payout_id, amount = approved.amount, "Payout approved");
                    return Ok(approved);
                }
                Err(e) if e.is_conflict() => {
                    debug!(payout_id, attempt, "Payout or balance changed, retrying approval");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(PayoutError::Contended(payout_id.to_string()))
    }

    #[instrument(name = "payouts.reject", skip(self))]
    pub async fn reject_payout(&self, payout_id: &str) -> Result<ManagerPayout, PayoutError> {
        self.move_payout(payout_id, PayoutStatus::Pending, PayoutStatus::Rejected)
            .await
    }

    #[instrument(name = "payouts.mark_paid", skip(self))]
    pub async fn mark_paid(&self, payout_id: &str) -> Result<ManagerPayout, PayoutError> {
        self.move_payout(payout_id, PayoutStatus::Approved, PayoutStatus::Paid)
            .await
    }

    async fn move_payout(
        &self,
        payout_id: &str,
        from: PayoutStatus,
        to: PayoutStatus,
    ) -> Result<ManagerPayout, PayoutError> {
        let payout = self.get(payout_id).await?;
        if payout.status != from {
            return Err(PayoutError::InvalidStatus {
                id: payout.id,
                status: payout.status,
            });
        }

        let mut next = payout;
        next.status = to;
        next.processed_at = Some(self.clock.now());
        self.store
            .commit(vec![Write::UpdatePayout(next.clone())])
            .await?;
        next.bump();
        info!(payout_id, status = %to, "Payout status changed");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::store::InMemoryStore;
    use chrono::Utc;

    async fn desk_with_balance(balance: i64) -> (PayoutDesk, Arc<InMemoryStore>, Manager) {
        let store = Arc::new(InMemoryStore::new());
        let mut manager = Manager::new(7, "Ann", 10, Utc::now());
        manager.balance = balance;
        store
            .commit(vec![Write::InsertManager(manager.clone())])
            .await
            .unwrap();
        (
            PayoutDesk::new(store.clone(), Arc::new(SystemClock)),
            store,
            manager,
        )
    }

    #[tokio::test]
    async fn test_approval_debits_balance() {
        let (desk, store, manager) = desk_with_balance(1_000).await;
        let payout = desk.request_payout(&manager.id, 600).await.unwrap();
        assert_eq!(payout.status, PayoutStatus::Pending);

        let approved = desk.approve_payout(&payout.id).await.unwrap();
        assert_eq!(approved.status, PayoutStatus::Approved);
        assert!(approved.processed_at.is_some());

        let stored = store.get_manager(&manager.id).await.unwrap().unwrap();
        assert_eq!(stored.balance, 400);

        let paid = desk.mark_paid(&payout.id).await.unwrap();
        assert_eq!(paid.status, PayoutStatus::Paid);
    }

    #[tokio::test]
    async fn test_second_approval_cannot_overdraw() {
        let (desk, _, manager) = desk_with_balance(1_000).await;
        let first = desk.request_payout(&manager.id, 700).await.unwrap();
        let second = desk.request_payout(&manager.id, 700).await.unwrap();

        desk.approve_payout(&first.id).await.unwrap();
        let err = desk.approve_payout(&second.id).await.unwrap_err();
        assert!(matches!(
            err,
            PayoutError::InsufficientBalance {
                requested: 700,
                available: 300
            }
        ));
    }

    #[tokio::test]
    async fn test_request_validation() {
        let (desk, _, manager) = desk_with_balance(100).await;
        assert!(matches!(
            desk.request_payout(&manager.id, 0).await,
            Err(PayoutError::InvalidAmount(0))
        ));
        assert!(matches!(
            desk.request_payout(&manager.id, 101).await,
            Err(PayoutError::InsufficientBalance { .. })
        ));
        assert!(matches!(
            desk.request_payout("missing", 10).await,
            Err(PayoutError::ManagerNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejection_keeps_balance() {
        let (desk, store, manager) = desk_with_balance(500).await;
        let payout = desk.request_payout(&manager.id, 200).await.unwrap();
        let rejected = desk.reject_payout(&payout.id).await.unwrap();
        assert_eq!(rejected.status, PayoutStatus::Rejected);

        let stored = store.get_manager(&manager.id).await.unwrap().unwrap();
        assert_eq!(stored.balance, 500);

        assert!(matches!(
            desk.mark_paid(&payout.id).await,
            Err(PayoutError::InvalidStatus { .. })
        ));
    }
}
