//! Transport traits the managers operate against.

use crate::error::TransportError;
use crate::message::Delivery;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Source of messages from a named queue or stream.
///
/// Implementations must deliver at most one outstanding, unacknowledged
/// message at a time: the managers rely on strictly sequential processing so
/// that staging order equals source order.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Start consuming from `queue`, yielding deliveries in broker order.
    /// The channel closes when the transport goes away.
    async fn consume(&mut self, queue: &str) -> Result<mpsc::Receiver<Delivery>, TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Sink publishing messages to a named queue.
///
/// `publish` is synchronous with respect to broker confirmation: it returns
/// only once the broker has confirmed the message, and fails on a negative
/// confirmation or a confirmation timeout.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, queue: &str, delivery: &Delivery) -> Result<(), TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}
