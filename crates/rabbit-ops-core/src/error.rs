//! Error types for message management operations.

use thiserror::Error;

/// Failure to settle a message with the broker.
#[derive(Debug, Error)]
#[error("broker acknowledgment failed: {message}")]
pub struct AckError {
    pub message: String,
}

impl From<lapin::Error> for AckError {
    fn from(err: lapin::Error) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

/// Errors raised by the broker transport (consuming, publishing, topology).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to broker at '{endpoint}': {source}")]
    Connect {
        endpoint: String,
        source: lapin::Error,
    },

    #[error("failed to open channel: {source}")]
    Channel { source: lapin::Error },

    #[error("failed to start consuming from '{queue}': {source}")]
    Consume {
        queue: String,
        source: lapin::Error,
    },

    #[error("failed to publish message to '{queue}': {source}")]
    Publish {
        queue: String,
        source: lapin::Error,
    },

    #[error("broker negatively confirmed publish to '{queue}'")]
    NegativeConfirm { queue: String },

    #[error("timed out after {timeout:?} waiting for publish confirmation from '{queue}'")]
    ConfirmTimeout {
        queue: String,
        timeout: std::time::Duration,
    },

    #[error("failed to declare queue '{queue}': {source}")]
    Declare {
        queue: String,
        source: lapin::Error,
    },

    #[error("failed to delete queue '{queue}': {source}")]
    Delete {
        queue: String,
        source: lapin::Error,
    },

    #[error("failed to close transport: {source}")]
    Close { source: lapin::Error },
}

/// Errors raised while compiling or evaluating a filter expression.
#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("invalid filter expression: {message}")]
    Compile { message: String },

    #[error("unknown name '{name}' in filter expression")]
    UnknownName { name: String },

    #[error("filter evaluation failed: {source}")]
    Evaluate {
        #[from]
        source: evalexpr::EvalexprError,
    },

    #[error("filter expression returned {found}, expected a boolean")]
    NotBoolean { found: String },
}

/// Errors raised while applying an operation's effect to a message.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("failed to publish message to destination: {0}")]
    Publish(#[from] TransportError),

    #[error("failed to encode message for viewing: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write viewed message: {0}")]
    Write(#[from] std::io::Error),
}

/// Terminal failures of a `manage` invocation.
///
/// No failure here is retried internally; every variant aborts the current
/// run and is returned to the caller. Recovery is operator-driven, either by
/// re-invoking with the same staging queue or by manual broker
/// administration (see the logged guidance accompanying each failure).
#[derive(Debug, Error)]
pub enum ManageError {
    #[error("failed to consume from '{queue}': {source}")]
    Consume {
        queue: String,
        source: TransportError,
    },

    #[error("selector failed for message {delivery_tag}: {source}")]
    Selection {
        delivery_tag: u64,
        source: SelectorError,
    },

    #[error("handler failed for message {delivery_tag}: {source}")]
    Handling {
        delivery_tag: u64,
        source: HandlerError,
    },

    #[error("failed to stage message {delivery_tag} to '{staging_queue}': {source}")]
    StagingPublish {
        delivery_tag: u64,
        staging_queue: String,
        source: TransportError,
    },

    #[error(
        "failed to move message {delivery_tag} from '{staging_queue}' back to '{source_queue}': {source}"
    )]
    RestagePublish {
        delivery_tag: u64,
        staging_queue: String,
        source_queue: String,
        source: TransportError,
    },

    #[error("failed to acknowledge message {delivery_tag}: {source}")]
    Acknowledge {
        delivery_tag: u64,
        source: AckError,
    },

    #[error("operation cancelled before completion")]
    Cancelled,
}

/// Errors from the management HTTP API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid endpoint '{endpoint}': {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    #[error("management API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("queue '{queue}' not found")]
    QueueNotFound { queue: String },
}
