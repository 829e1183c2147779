//! Channel statistics from the analytics provider
//!
//! The provider answers with an envelope `{ "status": "ok", "response": {..} }`
//! or `{ "status": "error", "error": ".." }`. Unknown channels and exhausted
//! quotas are normal outcomes and come back as `Ok(None)`.

use std::time::Duration;

use adslot::model::ChannelAnalytics;
use chrono::Utc;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::ProviderError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    #[serde(default)]
    pub participants_count: i64,
    #[serde(default)]
    pub avg_post_reach: i64,
    #[serde(default)]
    pub adv_post_reach_24h: i64,
    #[serde(default)]
    pub adv_post_reach_48h: i64,
    #[serde(default)]
    pub adv_post_reach_72h: i64,
    #[serde(default)]
    pub err_percent: f64,
    #[serde(default)]
    pub err24_percent: f64,
}

impl From<ChannelStats> for ChannelAnalytics {
    fn from(stats: ChannelStats) -> Self {
        ChannelAnalytics {
            subscribers: stats.participants_count,
            reach_24h: stats.adv_post_reach_24h,
            reach_48h: stats.adv_post_reach_48h,
            reach_72h: stats.adv_post_reach_72h,
            err_percent: stats.err_percent,
            err24_percent: stats.err24_percent,
            cpm: None,
            refreshed_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    response: Option<ChannelStats>,
    #[serde(default)]
    error: Option<String>,
}

fn is_soft_failure(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("not found") || message.contains("quota") || message.contains("limit")
}

#[derive(Debug, Clone)]
pub struct AnalyticsClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl AnalyticsClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        }
    }

    /// Reads `ANALYTICS_API_URL` and `ANALYTICS_API_TOKEN`. Both must be set.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("ANALYTICS_API_URL").ok()?;
        let token = std::env::var("ANALYTICS_API_TOKEN").ok()?;
        Some(Self::new(base_url, token))
    }

    /// Statistics for a channel, `None` when the provider has nothing for it.
    ///
    /// Transport failures are logged and treated like a miss so a provider
    /// outage never blocks the caller.
    #[tracing::instrument(name = "analytics.channel_stats", skip(self))]
    pub async fn channel_stats(
        &self,
        channel_id: &str,
    ) -> Result<Option<ChannelStats>, ProviderError> {
        match self.fetch(channel_id).await {
            Ok(stats) => Ok(stats),
            Err(ProviderError::Request(e)) => {
                tracing::warn!(channel_id, error = %e, "Analytics provider unreachable");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch(&self, channel_id: &str) -> Result<Option<ChannelStats>, ProviderError> {
        let url = format!("{}/channels/stat", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("token", self.token.as_str()), ("channelId", channel_id)])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::TOO_MANY_REQUESTS {
            tracing::debug!(channel_id, %status, "No analytics available");
            return Ok(None);
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Response {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        if envelope.status == "ok" {
            return Ok(envelope.response);
        }

        let message = envelope.error.unwrap_or_default();
        if is_soft_failure(&message) {
            tracing::debug!(channel_id, reason = %message, "No analytics available");
            return Ok(None);
        }
        Err(ProviderError::Response {
            status: status.as_u16(),
            message,
        })
    }
}
