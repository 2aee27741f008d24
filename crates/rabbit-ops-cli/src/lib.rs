//! # rabbit-ops CLI
//!
//! Command-line interface for bulk message operations on RabbitMQ queues and
//! streams: view, move, copy, and purge with optional filtering, preserving
//! the order of the messages that stay behind.
//!
//! The CLI owns everything around the core drain/restage engines: argument
//! parsing, logging setup, queue type resolution, the staging queue
//! lifecycle, and signal-driven cancellation.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rabbit_ops_core::{
    AdminChannel, AlwaysSelector, AmqpConsumer, AmqpPublisher, ApiClient, Consumer, CopyHandler,
    ExpressionSelector, Manager, MessageHandler, MoveHandler, Publisher, PurgeHandler,
    QueueManager, QueueType, Selector, StreamManager, ViewHandler,
};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

const STREAM_SUPPORTED_COMMANDS: &str = "view, copy";

/// Manage RabbitMQ queues: view, move, copy or purge a filtered subset of
/// messages while preserving the order of the rest.
#[derive(Debug, Parser)]
#[command(name = "rabbit-ops")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Bulk message operations for RabbitMQ queues and streams")]
pub struct Cli {
    /// RabbitMQ server address to connect to.
    #[arg(long, env = "RABBITMQ_ENDPOINT")]
    pub endpoint: String,

    /// RabbitMQ management HTTP API address. Derived from the AMQP endpoint
    /// when omitted (port 5672 becomes 15672).
    #[arg(long, env = "RABBITMQ_HTTP_API_ENDPOINT")]
    pub http_api_endpoint: Option<String>,

    /// Name of the source queue to manage.
    #[arg(short, long)]
    pub queue: String,

    /// Staging queue used to preserve the original message order. Messages
    /// that must stay in the source queue are moved here during the
    /// operation and moved back afterwards in the same order. If provided,
    /// the queue must already exist (pass the staging queue of an
    /// interrupted run to resume it); otherwise a server-named durable
    /// queue is created.
    #[arg(short = 't', long)]
    pub temp_queue: Option<String>,

    /// Filter messages with a boolean expression over the message fields,
    /// e.g. 'type == "some.msg.type"' or
    /// 'str::regex_matches(type, "^msg.*")'.
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Logging verbosity level (info, error).
    #[arg(short, long, default_value = "error")]
    pub verbosity: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available operations.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// View messages from the queue, preserving its content and order.
    View {
        /// Number of messages to print. All messages are still processed;
        /// this only caps how many are printed. Zero or negative means
        /// every message is printed.
        #[arg(short, long, default_value_t = 0)]
        count: i64,

        /// Output file for the viewed messages; stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Move messages from the source to a destination queue.
    Move {
        /// Name of the destination queue to move messages to.
        #[arg(short, long)]
        destination: String,
    },

    /// Copy messages from the source to a destination queue.
    Copy {
        /// Name of the destination queue to copy messages to.
        #[arg(short, long)]
        destination: String,
    },

    /// Purge messages from the queue.
    Purge,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::View { .. } => "view",
            Self::Move { .. } => "move",
            Self::Copy { .. } => "copy",
            Self::Purge => "purge",
        }
    }

    /// Whether the operation is safe for append-only stream sources, i.e.
    /// never needs to remove anything from the source.
    fn is_stream_safe(&self) -> bool {
        matches!(self, Self::View { .. } | Self::Copy { .. })
    }

    fn destination(&self) -> Option<&str> {
        match self {
            Self::Move { destination } | Self::Copy { destination } => Some(destination),
            _ => None,
        }
    }
}

/// Run the CLI to completion.
pub async fn run(cli: Cli) -> Result<()> {
    init_tracing(&cli.verbosity)?;

    let cancel = CancellationToken::new();
    spawn_signal_listener(cancel.clone());

    let api = ApiClient::from_amqp_endpoint(&cli.endpoint, cli.http_api_endpoint.as_deref())?;
    let queue_info = api.queue_info(&cli.queue).await?;

    if queue_info.queue_type == QueueType::Stream && !cli.command.is_stream_safe() {
        bail!(
            "{} queue type does not support the {} command. Supported commands: {}",
            queue_info.queue_type,
            cli.command.name(),
            STREAM_SUPPORTED_COMMANDS
        );
    }

    // Fail fast when the destination queue does not exist.
    if let Some(destination) = cli.command.destination() {
        api.queue_info(destination).await?;
    }

    let publisher: Arc<dyn Publisher> = Arc::new(AmqpPublisher::connect(&cli.endpoint).await?);
    let selector = build_selector(cli.filter.as_deref())?;
    let handler = build_handler(&cli.command, Arc::clone(&publisher))?;

    info!(
        total = queue_info.messages,
        ready = queue_info.messages_ready,
        unacknowledged = queue_info.messages_unacknowledged,
        "source queue messages info"
    );

    let result = match queue_info.queue_type {
        QueueType::Classic | QueueType::Quorum => {
            manage_queue(&cli, cancel, publisher.clone(), handler, selector).await
        }
        QueueType::Stream => manage_stream(&cli, cancel, handler, selector).await,
    };

    if let Err(err) = publisher.close().await {
        warn!(error = %err, "error while closing publisher");
    }

    result
}

/// Drive the queue manager, owning the staging queue lifecycle around it.
async fn manage_queue(
    cli: &Cli,
    cancel: CancellationToken,
    publisher: Arc<dyn Publisher>,
    handler: Box<dyn MessageHandler>,
    selector: Box<dyn Selector>,
) -> Result<()> {
    let admin = AdminChannel::connect(&cli.endpoint).await?;
    let staging_queue = admin
        .declare_staging_queue(cli.temp_queue.as_deref())
        .await?;

    let mut consumer = AmqpConsumer::connect(&cli.endpoint).await?;
    let result = {
        let mut manager = QueueManager::new(
            &mut consumer,
            publisher,
            handler,
            selector,
            staging_queue.clone(),
        );
        manager.manage(cancel, &cli.queue).await
    };

    if let Err(err) = consumer.close().await {
        warn!(error = %err, "error while closing consumer");
    }
    // The deletion is conditional on the queue being empty: a failed run's
    // staging content must remain inspectable and resumable.
    if let Err(err) = admin.delete_if_empty(&staging_queue).await {
        warn!(
            error = %err,
            queue = %staging_queue,
            "failed to delete staging queue; if needed, please delete it manually"
        );
    }
    if let Err(err) = admin.close().await {
        warn!(error = %err, "error while closing admin channel");
    }

    Ok(result?)
}

async fn manage_stream(
    cli: &Cli,
    cancel: CancellationToken,
    handler: Box<dyn MessageHandler>,
    selector: Box<dyn Selector>,
) -> Result<()> {
    let mut consumer = AmqpConsumer::connect_stream(&cli.endpoint, "first").await?;
    let result = StreamManager::new(&mut consumer, handler, selector)
        .manage(cancel, &cli.queue)
        .await;

    if let Err(err) = consumer.close().await {
        warn!(error = %err, "error while closing consumer");
    }

    Ok(result?)
}

fn build_selector(filter: Option<&str>) -> Result<Box<dyn Selector>> {
    Ok(match filter {
        Some(expr) => Box::new(ExpressionSelector::new(expr)?),
        None => Box::new(AlwaysSelector),
    })
}

fn build_handler(command: &Commands, publisher: Arc<dyn Publisher>) -> Result<Box<dyn MessageHandler>> {
    Ok(match command {
        Commands::View { count, output } => {
            let budget = if *count <= 0 {
                usize::MAX
            } else {
                *count as usize
            };
            let sink: Box<dyn Write + Send + Sync> = match output {
                Some(path) => Box::new(File::create(path).with_context(|| {
                    format!("failed to create output file {}", path.display())
                })?),
                None => Box::new(io::stdout()),
            };
            Box::new(ViewHandler::new(budget, sink))
        }
        Commands::Move { destination } => {
            Box::new(MoveHandler::new(publisher, destination.clone()))
        }
        Commands::Copy { destination } => {
            Box::new(CopyHandler::new(publisher, destination.clone()))
        }
        Commands::Purge => Box::new(PurgeHandler),
    })
}

fn init_tracing(verbosity: &str) -> Result<()> {
    let level = match verbosity {
        "info" => "info",
        "error" => "error",
        other => bail!("unsupported verbosity level '{other}' (expected info or error)"),
    };

    // RUST_LOG takes precedence over the flag when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    Ok(())
}

/// Cancel the token on SIGINT or SIGTERM so an in-flight drain stops at the
/// next loop iteration; the unacknowledged message is left for redelivery.
fn spawn_signal_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut terminate) => {
                    tokio::select! {
                        _ = ctrl_c => {}
                        _ = terminate.recv() => {}
                    }
                }
                Err(_) => {
                    let _ = ctrl_c.await;
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }

        cancel.cancel();
    });
}
