//! lapin-backed publisher with synchronous broker confirmation.

use crate::amqp::convert;
use crate::error::TransportError;
use crate::message::Delivery;
use crate::pubsub::Publisher;
use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions};
use lapin::publisher_confirm::Confirmation;
use lapin::{Channel, Connection, ConnectionProperties};
use std::time::Duration;

const CLOSE_REPLY_SUCCESS: u16 = 200;

/// How long to wait for a broker confirmation before treating a publish as
/// failed.
const CONFIRM_TIMEOUT: Duration = Duration::from_secs(10);

/// Publishes messages to the default exchange with the queue name as the
/// routing key. The channel runs in confirm mode, so every publish waits for
/// the broker to durably accept the message before returning.
pub struct AmqpPublisher {
    connection: Connection,
    channel: Channel,
}

impl AmqpPublisher {
    pub async fn connect(endpoint: &str) -> Result<Self, TransportError> {
        let connection = Connection::connect(endpoint, ConnectionProperties::default())
            .await
            .map_err(|source| TransportError::Connect {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|source| TransportError::Channel { source })?;

        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|source| TransportError::Channel { source })?;

        Ok(Self {
            connection,
            channel,
        })
    }
}

#[async_trait]
impl Publisher for AmqpPublisher {
    async fn publish(&self, queue: &str, delivery: &Delivery) -> Result<(), TransportError> {
        let (properties, payload) = convert::delivery_to_amqp(delivery);

        let confirm = self
            .channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                &payload,
                properties,
            )
            .await
            .map_err(|source| TransportError::Publish {
                queue: queue.to_string(),
                source,
            })?;

        let confirmation = tokio::time::timeout(CONFIRM_TIMEOUT, confirm)
            .await
            .map_err(|_| TransportError::ConfirmTimeout {
                queue: queue.to_string(),
                timeout: CONFIRM_TIMEOUT,
            })?
            .map_err(|source| TransportError::Publish {
                queue: queue.to_string(),
                source,
            })?;

        match confirmation {
            Confirmation::Ack(_) => Ok(()),
            Confirmation::Nack(_) | Confirmation::NotRequested => {
                Err(TransportError::NegativeConfirm {
                    queue: queue.to_string(),
                })
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.channel
            .close(CLOSE_REPLY_SUCCESS, "")
            .await
            .map_err(|source| TransportError::Close { source })?;
        self.connection
            .close(CLOSE_REPLY_SUCCESS, "")
            .await
            .map_err(|source| TransportError::Close { source })?;
        Ok(())
    }
}
