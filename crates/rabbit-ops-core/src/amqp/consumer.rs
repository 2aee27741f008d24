//! lapin-backed consumer delivering at most one outstanding message.

use crate::amqp::convert;
use crate::error::{AckError, TransportError};
use crate::message::{Acknowledger, Delivery};
use crate::pubsub::Consumer;
use async_trait::async_trait;
use futures::StreamExt;
use lapin::acker::Acker;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions, BasicRejectOptions,
};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{Channel, Connection, ConnectionProperties};
use tokio::sync::mpsc;
use tracing::warn;

const CLOSE_REPLY_SUCCESS: u16 = 200;

/// Consumes from a queue or stream over a dedicated connection.
///
/// The channel runs with a prefetch of one so that exactly one delivery is
/// outstanding at a time; acknowledgment order therefore matches arrival
/// order, which the managers depend on.
pub struct AmqpConsumer {
    connection: Connection,
    channel: Channel,
    consume_args: FieldTable,
}

impl AmqpConsumer {
    /// Connect a consumer suitable for classic and quorum queues.
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
            .basic_qos(1, BasicQosOptions::default())
            .await
            .map_err(|source| TransportError::Channel { source })?;

        Ok(Self {
            connection,
            channel,
            consume_args: FieldTable::default(),
        })
    }

    /// Connect a consumer for a stream source, reading from the given offset
    /// (e.g. `"first"`).
    pub async fn connect_stream(endpoint: &str, offset: &str) -> Result<Self, TransportError> {
        let mut consumer = Self::connect(endpoint).await?;
        consumer
            .consume_args
            .insert("x-stream-offset".into(), AMQPValue::LongString(offset.into()));
        Ok(consumer)
    }
}

#[async_trait]
impl Consumer for AmqpConsumer {
    async fn consume(&mut self, queue: &str) -> Result<mpsc::Receiver<Delivery>, TransportError> {
        let mut consumer = self
            .channel
            .basic_consume(
                queue,
                "",
                BasicConsumeOptions::default(),
                self.consume_args.clone(),
            )
            .await
            .map_err(|source| TransportError::Consume {
                queue: queue.to_string(),
                source,
            })?;

        // Capacity one: together with the qos(1) prefetch this keeps the
        // pipeline strictly sequential.
        let (tx, rx) = mpsc::channel(1);
        let queue = queue.to_string();

        tokio::spawn(async move {
            while let Some(attempt) = consumer.next().await {
                match attempt {
                    Ok(delivery) => {
                        let delivery = convert::delivery_from_amqp(delivery);
                        if tx.send(delivery).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, queue, "consumer stream failed");
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
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

/// Settles deliveries through the lapin acker they arrived with.
pub(crate) struct AmqpAcknowledger {
    acker: Acker,
}

impl AmqpAcknowledger {
    pub(crate) fn new(acker: Acker) -> Self {
        Self { acker }
    }
}

#[async_trait]
impl Acknowledger for AmqpAcknowledger {
    async fn ack(&self, _delivery_tag: u64, multiple: bool) -> Result<(), AckError> {
        self.acker
            .ack(BasicAckOptions { multiple })
            .await
            .map_err(AckError::from)
    }

    async fn reject(&self, _delivery_tag: u64, requeue: bool) -> Result<(), AckError> {
        self.acker
            .reject(BasicRejectOptions { requeue })
            .await
            .map_err(AckError::from)
    }

    async fn nack(&self, _delivery_tag: u64, multiple: bool, requeue: bool) -> Result<(), AckError> {
        self.acker
            .nack(BasicNackOptions { multiple, requeue })
            .await
            .map_err(AckError::from)
    }
}
