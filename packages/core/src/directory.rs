//! Registration and upkeep of channels, clients and managers.

use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::clock::Clock;
use crate::ledger::MAX_CAS_ATTEMPTS;
use crate::model::{Channel, ChannelAnalytics, Client, FormatPrices, Manager, ManagerStatus};
use crate::progression::ProgressionConfig;
use crate::store::{BookingStore, StoreError, Versioned, Write};

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Client not found: {0}")]
    ClientNotFound(String),

    #[error("Manager not found: {0}")]
    ManagerNotFound(String),

    #[error("Price must be positive, got {0}")]
    InvalidPrice(i64),

    #[error("Record {0} is too contended to update")]
    Contended(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct NewChannel {
    pub external_id: String,
    pub title: String,
    pub username: Option<String>,
    pub category: String,
    pub prices: FormatPrices,
}

fn validate_prices(prices: &FormatPrices) -> Result<(), DirectoryError> {
    let all = [
        prices.top1_feed24,
        prices.top1_feed48,
        prices.top2_feed48,
        prices.native,
    ];
    match all.into_iter().flatten().find(|p| *p <= 0) {
        Some(price) => Err(DirectoryError::InvalidPrice(price)),
        None => Ok(()),
    }
}

#[derive(Debug, Clone)]
pub struct Directory {
    store: Arc<dyn BookingStore>,
    clock: Arc<dyn Clock>,
    progression: Arc<ProgressionConfig>,
}

impl Directory {
    pub fn new(
        store: Arc<dyn BookingStore>,
        clock: Arc<dyn Clock>,
        progression: Arc<ProgressionConfig>,
    ) -> Self {
        Self {
            store,
            clock,
            progression,
        }
    }

    pub async fn channel(&self, channel_id: &str) -> Result<Channel, DirectoryError> {
        self.store
            .get_channel(channel_id)
            .await?
            .ok_or_else(|| DirectoryError::ChannelNotFound(channel_id.to_string()))
    }

    pub async fn client(&self, client_id: &str) -> Result<Client, DirectoryError> {
        self.store
            .get_client(client_id)
            .await?
            .ok_or_else(|| DirectoryError::ClientNotFound(client_id.to_string()))
    }

    pub async fn manager(&self, manager_id: &str) -> Result<Manager, DirectoryError> {
        self.store
            .get_manager(manager_id)
            .await?
            .ok_or_else(|| DirectoryError::ManagerNotFound(manager_id.to_string()))
    }

    #[instrument(name = "directory.register_channel", skip(self, request))]
    pub async fn register_channel(&self, request: NewChannel) -> Result<Channel, DirectoryError> {
        validate_prices(&request.prices)?;
        let mut channel = Channel::new(
            request.external_id,
            request.title,
            request.category,
            self.clock.now(),
        );
        channel.username = request.username;
        channel.prices = request.prices;

        self.store
            .commit(vec![Write::InsertChannel(channel.clone())])
            .await?;
        info!(channel_id = %channel.id, "Channel registered");
        Ok(channel)
    }

    #[instrument(name = "directory.register_client", skip(self))]
    pub async fn register_client(
        &self,
        telegram_id: i64,
        name: &str,
    ) -> Result<Client, DirectoryError> {
        let client = Client::new(telegram_id, name, self.clock.now());
        self.store
            .commit(vec![Write::InsertClient(client.clone())])
            .await?;
        info!(client_id = %client.id, "Client registered");
        Ok(client)
    }

    /// New managers start as trainees on the first level's commission
    #[instrument(name = "directory.register_manager", skip(self))]
    pub async fn register_manager(
        &self,
        telegram_id: i64,
        name: &str,
    ) -> Result<Manager, DirectoryError> {
        let rate = self
            .progression
            .spec(1)
            .map(|spec| spec.commission_rate)
            .unwrap_or_default();
        let manager = Manager::new(telegram_id, name, rate, self.clock.now());
        self.store
            .commit(vec![Write::InsertManager(manager.clone())])
            .await?;
        info!(manager_id = %manager.id, "Manager registered");
        Ok(manager)
    }

    #[instrument(name = "directory.set_manager_status", skip(self))]
    pub async fn set_manager_status(
        &self,
        manager_id: &str,
        status: ManagerStatus,
    ) -> Result<Manager, DirectoryError> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let mut manager = self.manager(manager_id).await?;
            if manager.status == status {
                return Ok(manager);
            }
            manager.status = status;
            match self
                .store
                .commit(vec![Write::UpdateManager(manager.clone())])
                .await
            {
                Ok(()) => {
                    manager.bump();
                    info!(manager_id, %status, "Manager status changed");
                    return Ok(manager);
                }
                Err(e) if e.is_conflict() => {
                    debug!(manager_id, attempt, "Manager changed concurrently, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(DirectoryError::Contended(manager_id.to_string()))
    }

    #[instrument(name = "directory.set_prices", skip(self, prices))]
    pub async fn set_prices(
        &self,
        channel_id: &str,
        prices: FormatPrices,
    ) -> Result<Channel, DirectoryError> {
        validate_prices(&prices)?;
        self.update_channel(channel_id, |channel| {
            channel.prices = prices.clone();
            let analytics = channel.analytics.clone();
            channel.apply_analytics(analytics);
        })
        .await
    }

    /// Stores a fresh analytics snapshot and re-derives the channel's CPM
    #[instrument(name = "directory.apply_analytics", skip(self, analytics))]
    pub async fn apply_analytics(
        &self,
        channel_id: &str,
        analytics: ChannelAnalytics,
    ) -> Result<Channel, DirectoryError> {
        self.update_channel(channel_id, |channel| {
            channel.apply_analytics(analytics.clone())
        })
        .await
    }

    async fn update_channel<F>(&self, channel_id: &str, change: F) -> Result<Channel, DirectoryError>
    where
        F: Fn(&mut Channel),
    {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let mut channel = self.channel(channel_id).await?;
            change(&mut channel);
            match self
                .store
                .commit(vec![Write::UpdateChannel(channel.clone())])
                .await
            {
                Ok(()) => {
                    channel.bump();
                    return Ok(channel);
                }
                Err(e) if e.is_conflict() => {
                    debug!(channel_id, attempt, "Channel changed concurrently, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(DirectoryError::Contended(channel_id.to_string()))
    }
}
