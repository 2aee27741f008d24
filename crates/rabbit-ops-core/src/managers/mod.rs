//! Drain/restage managers: the order-sensitive bulk mutation engines.

use crate::error::ManageError;
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

mod queue;
mod stream;

pub use queue::QueueManager;
pub use stream::StreamManager;

/// The broker gives no explicit "queue is empty" signal; a drain completes
/// after this long without a new message arriving.
pub(crate) const IDLE_TIMEOUT: Duration = Duration::from_secs(1);

/// Emit a progress log every this many processed messages.
pub(crate) const PROGRESS_INTERVAL: u64 = 1000;

/// Applies the configured selector and handler to every message of a source
/// queue or stream.
#[async_trait]
pub trait Manager: Send {
    /// Drain `source_queue`, applying the operation to each selected message.
    /// Returns on idle completion, cancellation, or the first failure; no
    /// failure is retried internally.
    async fn manage(
        &mut self,
        cancel: CancellationToken,
        source_queue: &str,
    ) -> Result<(), ManageError>;
}
