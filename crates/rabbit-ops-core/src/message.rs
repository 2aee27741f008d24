//! Message snapshot and acknowledgment capability types.

use crate::error::AckError;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;

/// Capability to settle a message with the broker, bound to the channel the
/// message arrived on. Exactly one terminal call is made per message; making
/// none (on cancellation) leaves the message for broker redelivery.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Acknowledger: Send + Sync {
    /// Acknowledge the message, removing it from the queue.
    async fn ack(&self, delivery_tag: u64, multiple: bool) -> Result<(), AckError>;

    /// Reject the message, optionally requeueing it at its original position.
    async fn reject(&self, delivery_tag: u64, requeue: bool) -> Result<(), AckError>;

    /// Negatively acknowledge one or more messages.
    async fn nack(&self, delivery_tag: u64, multiple: bool, requeue: bool) -> Result<(), AckError>;
}

/// Scalar AMQP message properties.
///
/// `delivery_mode` and `priority` follow the wire convention where zero means
/// unset, matching how they are omitted from the JSON projection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub delivery_mode: u8,
    pub priority: u8,
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
    pub expiration: Option<String>,
    pub message_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    /// AMQP message `type` property.
    pub kind: Option<String>,
    pub user_id: Option<String>,
    pub app_id: Option<String>,
}

/// Immutable snapshot of a message received from the broker, together with
/// the bound capability to settle it.
///
/// The drain loop owns a delivery exclusively until it is acknowledged or
/// rejected, at which point responsibility transfers back to the broker.
pub struct Delivery {
    /// Unique-per-channel, monotonically increasing delivery identifier.
    pub delivery_tag: u64,
    pub redelivered: bool,
    pub exchange: String,
    pub routing_key: String,
    pub properties: Properties,
    /// Application headers; values may nest arbitrarily.
    pub headers: Map<String, Value>,
    pub body: Bytes,
    acknowledger: Arc<dyn Acknowledger>,
}

impl Delivery {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        delivery_tag: u64,
        redelivered: bool,
        exchange: String,
        routing_key: String,
        properties: Properties,
        headers: Map<String, Value>,
        body: Bytes,
        acknowledger: Arc<dyn Acknowledger>,
    ) -> Self {
        Self {
            delivery_tag,
            redelivered,
            exchange,
            routing_key,
            properties,
            headers,
            body,
            acknowledger,
        }
    }

    /// Acknowledge this delivery, removing it from its queue.
    pub async fn ack(&self, multiple: bool) -> Result<(), AckError> {
        self.acknowledger.ack(self.delivery_tag, multiple).await
    }

    /// Reject this delivery. With `requeue` the broker returns the message to
    /// the front of its queue, without it the message is dropped.
    pub async fn reject(&self, requeue: bool) -> Result<(), AckError> {
        self.acknowledger.reject(self.delivery_tag, requeue).await
    }

    /// Negatively acknowledge this delivery.
    pub async fn nack(&self, multiple: bool, requeue: bool) -> Result<(), AckError> {
        self.acknowledger
            .nack(self.delivery_tag, multiple, requeue)
            .await
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("delivery_tag", &self.delivery_tag)
            .field("redelivered", &self.redelivered)
            .field("exchange", &self.exchange)
            .field("routing_key", &self.routing_key)
            .field("properties", &self.properties)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}
