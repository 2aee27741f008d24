//! Manager for append-only streams.
//!
//! Streams are offset-addressed and append-only: acknowledging a delivery
//! only advances this consumer's offset bookkeeping, it removes nothing.
//! There is therefore no staging queue and no restage phase, and the
//! handler's retain decision carries no weight. Destructive operations
//! (move, purge) are rejected for stream sources by the caller.

use crate::error::ManageError;
use crate::handlers::MessageHandler;
use crate::managers::{Manager, IDLE_TIMEOUT, PROGRESS_INTERVAL};
use crate::message::Delivery;
use crate::pubsub::Consumer;
use crate::selectors::Selector;
use async_trait::async_trait;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;

const STREAM_FAILURE_HELP: &str = "Source stream has potentially been partially managed. \
Please act accordingly on the destination queue.";

/// Drains an append-only stream, applying read-safe operations only.
pub struct StreamManager<'a> {
    consumer: &'a mut dyn Consumer,
    handler: Box<dyn MessageHandler>,
    selector: Box<dyn Selector>,
}

impl<'a> StreamManager<'a> {
    pub fn new(
        consumer: &'a mut dyn Consumer,
        handler: Box<dyn MessageHandler>,
        selector: Box<dyn Selector>,
    ) -> Self {
        Self {
            consumer,
            handler,
            selector,
        }
    }

    async fn drain_stream(
        &mut self,
        cancel: &CancellationToken,
        source_stream: &str,
    ) -> Result<(), ManageError> {
        let mut messages =
            self.consumer
                .consume(source_stream)
                .await
                .map_err(|source| ManageError::Consume {
                    queue: source_stream.to_string(),
                    source,
                })?;

        info!(source_stream, "processing source stream");

        let started = Instant::now();
        let mut processed: u64 = 0;
        let mut selected: u64 = 0;

        let result = self
            .drain_stream_loop(
                cancel,
                &mut messages,
                source_stream,
                started,
                &mut processed,
                &mut selected,
            )
            .await;

        info!(
            processed,
            selected,
            elapsed = ?started.elapsed(),
            "processing source stream finished"
        );

        result
    }

    async fn drain_stream_loop(
        &mut self,
        cancel: &CancellationToken,
        messages: &mut mpsc::Receiver<Delivery>,
        source_stream: &str,
        started: Instant,
        processed: &mut u64,
        selected: &mut u64,
    ) -> Result<(), ManageError> {
        let mut last_processed: Option<u64> = None;

        loop {
            tokio::select! {
                received = messages.recv() => {
                    let Some(msg) = received else { break };
                    *processed += 1;

                    let is_selected = match self.selector.is_selected(&msg) {
                        Ok(is_selected) => is_selected,
                        Err(source) => {
                            let err = ManageError::Selection {
                                delivery_tag: msg.delivery_tag,
                                source,
                            };
                            return Err(self.fail_stream_message(err, &msg, source_stream).await);
                        }
                    };

                    if is_selected {
                        *selected += 1;
                        // The retain decision is meaningless for a stream:
                        // nothing can be removed from it either way.
                        if let Err(source) = self.handler.handle(&msg).await {
                            let err = ManageError::Handling {
                                delivery_tag: msg.delivery_tag,
                                source,
                            };
                            return Err(self.fail_stream_message(err, &msg, source_stream).await);
                        }
                    }

                    if let Err(source) = msg.ack(false).await {
                        let err = ManageError::Acknowledge {
                            delivery_tag: msg.delivery_tag,
                            source,
                        };
                        self.log_stream_failure(&err, &msg, source_stream);
                        return Err(err);
                    }

                    if *processed % PROGRESS_INTERVAL == 0 {
                        info!(
                            processed = *processed,
                            selected = *selected,
                            elapsed = ?started.elapsed(),
                            "processing source stream progress"
                        );
                    }
                    last_processed = Some(msg.delivery_tag);
                }
                _ = cancel.cancelled() => {
                    error!(
                        last_processed_tag = last_processed,
                        source_stream,
                        help = STREAM_FAILURE_HELP,
                        "cancelled while processing source stream"
                    );
                    return Err(ManageError::Cancelled);
                }
                _ = tokio::time::sleep(IDLE_TIMEOUT) => break,
            }
        }

        Ok(())
    }

    async fn fail_stream_message(
        &self,
        err: ManageError,
        msg: &Delivery,
        source_stream: &str,
    ) -> ManageError {
        self.log_stream_failure(&err, msg, source_stream);
        if let Err(reject_err) = msg.reject(true).await {
            error!(
                error = %reject_err,
                delivery_tag = msg.delivery_tag,
                source_stream,
                help = STREAM_FAILURE_HELP,
                "failed to reject message"
            );
        }
        err
    }

    fn log_stream_failure(&self, err: &ManageError, msg: &Delivery, source_stream: &str) {
        error!(
            error = %err,
            message = ?msg,
            source_stream,
            help = STREAM_FAILURE_HELP,
            "error occurred while processing source stream"
        );
    }
}

#[async_trait]
impl Manager for StreamManager<'_> {
    async fn manage(
        &mut self,
        cancel: CancellationToken,
        source_queue: &str,
    ) -> Result<(), ManageError> {
        self.drain_stream(&cancel, source_queue).await
    }
}
