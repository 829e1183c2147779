//! Hand-off of posted orders to whatever publishes the creative

use async_trait::async_trait;
use tracing::info;

use crate::model::Order;

#[derive(Debug, thiserror::Error)]
pub enum PostingError {
    #[error("Failed to schedule post for order {order_id}: {message}")]
    Schedule { order_id: String, message: String },
}

/// Receives orders that entered `posted`. Called after the transition is
/// committed; a failure never rolls the order back.
#[async_trait]
pub trait PostScheduler: Send + Sync + std::fmt::Debug {
    async fn schedule_post(&self, order: &Order) -> Result<(), PostingError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingPostScheduler;

#[async_trait]
impl PostScheduler for LoggingPostScheduler {
    async fn schedule_post(&self, order: &Order) -> Result<(), PostingError> {
        info!(
            order_id = %order.id,
            slot_id = %order.slot_id,
            format = %order.format,
            "Post handed off for publishing"
        );
        Ok(())
    }
}
