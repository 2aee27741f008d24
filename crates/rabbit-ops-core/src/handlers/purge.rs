//! Purge handler: drops every selected message.

use crate::error::HandlerError;
use crate::handlers::MessageHandler;
use crate::message::Delivery;
use async_trait::async_trait;

#[cfg(test)]
#[path = "purge_tests.rs"]
mod tests;

/// No effect; never retains, so selected messages are simply acknowledged
/// off the source.
#[derive(Debug, Default)]
pub struct PurgeHandler;

#[async_trait]
impl MessageHandler for PurgeHandler {
    async fn handle(&mut self, _delivery: &Delivery) -> Result<bool, HandlerError> {
        Ok(false)
    }
}
