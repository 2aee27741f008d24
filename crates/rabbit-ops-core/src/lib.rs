//! # rabbit-ops-core
//!
//! Order-preserving bulk message operations for RabbitMQ queues and streams:
//! view, move, copy, or purge a filtered subset of a queue while leaving the
//! rest of its content and relative ordering intact.
//!
//! Classic and quorum queues only support destructive removal, so the
//! [`managers::QueueManager`] drains the source through a durable staging
//! queue and restores the original order afterwards. Append-only streams
//! cannot be reordered at all, so the [`managers::StreamManager`] applies
//! read-safe operations in a single pass.
//!
//! ## Module Organization
//!
//! - [`message`] - Message snapshot and acknowledgment capability
//! - [`fields`] - Fixed field projection for filtering and viewing
//! - [`error`] - Error types for all operations
//! - [`pubsub`] - Consumer/publisher transport traits
//! - [`selectors`] - Predicates deciding which messages are operated on
//! - [`handlers`] - Operation effects and retain decisions
//! - [`managers`] - The drain/restage state machines
//! - [`amqp`] - lapin transport and management API client

pub mod amqp;
pub mod error;
pub mod fields;
pub mod handlers;
pub mod managers;
pub mod message;
pub mod pubsub;
pub mod selectors;

// Re-export commonly used types at crate root for convenience
pub use amqp::{AdminChannel, AmqpConsumer, AmqpPublisher, ApiClient, QueueInfo, QueueType};
pub use error::{AckError, ApiError, HandlerError, ManageError, SelectorError, TransportError};
pub use fields::{Body, MessageFields};
pub use handlers::{CopyHandler, MessageHandler, MoveHandler, PurgeHandler, ViewHandler};
pub use managers::{Manager, QueueManager, StreamManager};
pub use message::{Acknowledger, Delivery, Properties};
pub use pubsub::{Consumer, Publisher};
pub use selectors::{AlwaysSelector, ExpressionSelector, Selector};
