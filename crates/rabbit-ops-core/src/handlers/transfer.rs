//! Move and copy handlers: publish messages to a destination queue.

use crate::error::HandlerError;
use crate::handlers::MessageHandler;
use crate::message::Delivery;
use crate::pubsub::Publisher;
use async_trait::async_trait;
use std::sync::Arc;

#[cfg(test)]
#[path = "transfer_tests.rs"]
mod tests;

/// Publishes each message to the destination and drops it from the source.
/// On publish failure the message is not dropped; the error aborts the run
/// with the source copy rejected back to the front of the queue.
pub struct MoveHandler {
    publisher: Arc<dyn Publisher>,
    destination: String,
}

impl MoveHandler {
    pub fn new(publisher: Arc<dyn Publisher>, destination: String) -> Self {
        Self {
            publisher,
            destination,
        }
    }
}

#[async_trait]
impl MessageHandler for MoveHandler {
    async fn handle(&mut self, delivery: &Delivery) -> Result<bool, HandlerError> {
        self.publisher.publish(&self.destination, delivery).await?;
        Ok(false)
    }
}

/// Publishes each message to the destination while retaining it in the
/// source.
pub struct CopyHandler {
    publisher: Arc<dyn Publisher>,
    destination: String,
}

impl CopyHandler {
    pub fn new(publisher: Arc<dyn Publisher>, destination: String) -> Self {
        Self {
            publisher,
            destination,
        }
    }
}

#[async_trait]
impl MessageHandler for CopyHandler {
    async fn handle(&mut self, delivery: &Delivery) -> Result<bool, HandlerError> {
        self.publisher.publish(&self.destination, delivery).await?;
        Ok(true)
    }
}
