//! RabbitMQ transport: lapin-backed consumer/publisher, queue
//! administration, and the management HTTP API client.

mod admin;
mod api;
mod consumer;
mod convert;
mod publisher;

pub use admin::AdminChannel;
pub use api::{ApiClient, QueueInfo, QueueType};
pub use consumer::AmqpConsumer;
pub use publisher::AmqpPublisher;
