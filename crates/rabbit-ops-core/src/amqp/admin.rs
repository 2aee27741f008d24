//! Queue administration for the staging queue lifecycle.

use crate::error::TransportError;
use lapin::options::{QueueDeclareOptions, QueueDeleteOptions};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties};

const CLOSE_REPLY_SUCCESS: u16 = 200;

/// A dedicated channel for declaring and deleting the staging queue. The
/// managers themselves never create or delete it; a failed run's partial
/// staging state must remain inspectable and resumable.
pub struct AdminChannel {
    connection: Connection,
    channel: Channel,
}

impl AdminChannel {
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

        Ok(Self {
            connection,
            channel,
        })
    }

    /// Resolve the staging queue: passively verify an operator-supplied name
    /// (it must already exist, e.g. when resuming an interrupted run), or
    /// declare a new durable, server-named queue.
    pub async fn declare_staging_queue(
        &self,
        name: Option<&str>,
    ) -> Result<String, TransportError> {
        match name {
            Some(name) => {
                self.channel
                    .queue_declare(
                        name,
                        QueueDeclareOptions {
                            passive: true,
                            durable: true,
                            ..QueueDeclareOptions::default()
                        },
                        FieldTable::default(),
                    )
                    .await
                    .map_err(|source| TransportError::Declare {
                        queue: name.to_string(),
                        source,
                    })?;
                Ok(name.to_string())
            }
            None => {
                let queue = self
                    .channel
                    .queue_declare(
                        "",
                        QueueDeclareOptions {
                            durable: true,
                            ..QueueDeclareOptions::default()
                        },
                        FieldTable::default(),
                    )
                    .await
                    .map_err(|source| TransportError::Declare {
                        queue: String::new(),
                        source,
                    })?;
                Ok(queue.name().to_string())
            }
        }
    }

    /// Delete the staging queue if it is empty. A non-empty staging queue
    /// (failed run) is deliberately left in place.
    pub async fn delete_if_empty(&self, name: &str) -> Result<(), TransportError> {
        self.channel
            .queue_delete(
                name,
                QueueDeleteOptions {
                    if_empty: true,
                    ..QueueDeleteOptions::default()
                },
            )
            .await
            .map_err(|source| TransportError::Delete {
                queue: name.to_string(),
                source,
            })?;
        Ok(())
    }

    pub async fn close(&self) -> Result<(), TransportError> {
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
