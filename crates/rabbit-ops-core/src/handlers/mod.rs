//! Handlers apply an operation's effect to a selected message and decide
//! whether it must be retained in the source.

use crate::error::HandlerError;
use crate::message::Delivery;
use async_trait::async_trait;

mod purge;
mod transfer;
mod view;

pub use purge::PurgeHandler;
pub use transfer::{CopyHandler, MoveHandler};
pub use view::ViewHandler;

/// Applies one operation's effect to a message.
///
/// The returned boolean is the retain decision: `true` means the message
/// must survive in the source queue (and, for classic/quorum queues, be
/// staged so its position can be restored); `false` means its lifecycle is
/// complete and it is dropped from the source.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&mut self, delivery: &Delivery) -> Result<bool, HandlerError>;
}
