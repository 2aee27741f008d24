//! View handler: renders messages as JSON lines without touching them.

use crate::error::HandlerError;
use crate::fields::MessageFields;
use crate::handlers::MessageHandler;
use crate::message::Delivery;
use async_trait::async_trait;
use std::io::Write;

#[cfg(test)]
#[path = "view_tests.rs"]
mod tests;

/// Renders the field projection of each message as one JSON line to a sink,
/// up to a budget of `count` lines. Every message is retained; once the
/// budget is exhausted further calls are no-ops (the drain still processes
/// the whole queue so order can be restored).
pub struct ViewHandler {
    remaining: usize,
    sink: Box<dyn Write + Send + Sync>,
}

impl ViewHandler {
    pub fn new(count: usize, sink: Box<dyn Write + Send + Sync>) -> Self {
        Self {
            remaining: count,
            sink,
        }
    }
}

#[async_trait]
impl MessageHandler for ViewHandler {
    async fn handle(&mut self, delivery: &Delivery) -> Result<bool, HandlerError> {
        if self.remaining == 0 {
            return Ok(true);
        }

        let fields = MessageFields::from_delivery(delivery);
        serde_json::to_writer(&mut self.sink, &fields)?;
        self.sink.write_all(b"\n")?;
        self.remaining -= 1;

        Ok(true)
    }
}
