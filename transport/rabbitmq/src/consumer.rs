//! Consumer registration and supervision

use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;

use futures_util::stream::{select_all, Stream, StreamExt};
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions,
};
use lapin::types::FieldTable;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use herald_core::{HeraldError, NotificationMessage, QueueHandler};

use crate::config::RabbitConfig;
use crate::connection::open;
use crate::topology::ensure_topology;

type DeliveryStream =
    Pin<Box<dyn Stream<Item = (String, QueueHandler, Result<Delivery, lapin::Error>)> + Send>>;

/// Registers per-queue handlers and supervises the consume loop.
///
/// All registered queues are consumed on a single background task over
/// one dedicated connection: deliveries are dispatched sequentially and
/// cooperatively, so a handler that blocks stalls every queue sharing
/// the loop. Handlers must return promptly.
pub struct ConsumerSupervisor {
    config: RabbitConfig,
    handlers: HashMap<String, QueueHandler>,
}

/// Handle to a running supervisor task.
pub struct SupervisorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SupervisorHandle {
    /// Signal the supervisor to stop and wait for it to finish.
    ///
    /// The consume connection is dropped; unacknowledged in-flight
    /// messages return to the broker per its redelivery policy.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Supervisor task did not shut down cleanly");
        }
    }
}

impl ConsumerSupervisor {
    pub fn new(config: RabbitConfig) -> Self {
        Self {
            config,
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for one queue. Replaces any handler already
    /// registered for that queue.
    pub fn register(&mut self, queue: impl Into<String>, handler: QueueHandler) {
        self.handlers.insert(queue.into(), handler);
    }

    /// Queues with a registered handler.
    pub fn registered_queues(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    /// Start the supervision loop on a dedicated background task.
    ///
    /// The loop is crash-only: on any failure (connect, topology setup,
    /// consume error) it waits the configured restart delay and restarts
    /// the whole sequence from topology setup. Restarts are unbounded;
    /// only the shutdown signal ends the loop.
    pub fn spawn(self) -> SupervisorHandle {
        let (shutdown, signal) = watch::channel(false);
        let task = tokio::spawn(supervise(self.config, self.handlers, signal));
        SupervisorHandle { shutdown, task }
    }
}

async fn supervise(
    config: RabbitConfig,
    handlers: HashMap<String, QueueHandler>,
    mut shutdown: watch::Receiver<bool>,
) {
    let restart_delay = Duration::from_secs(config.restart_delay_seconds);

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("Consumer supervisor shutting down");
                return;
            }
            result = run_consumers(&config, &handlers) => {
                match result {
                    Ok(()) => warn!("Consume loop ended unexpectedly, restarting"),
                    Err(e) => error!(
                        error = %e,
                        restart_delay_seconds = config.restart_delay_seconds,
                        "Consume loop failed, restarting"
                    ),
                }
            }
        }

        tokio::select! {
            _ = shutdown.changed() => {
                info!("Consumer supervisor shutting down");
                return;
            }
            _ = tokio::time::sleep(restart_delay) => {}
        }
    }
}

/// One supervision iteration: connect, establish topology, register all
/// consumers, then dispatch deliveries until the transport fails.
async fn run_consumers(
    config: &RabbitConfig,
    handlers: &HashMap<String, QueueHandler>,
) -> Result<(), HeraldError> {
    if handlers.is_empty() {
        return Err(HeraldError::Handler(
            "no queue handlers registered".to_string(),
        ));
    }

    // Dedicated connection: the consume loop never shares the publish
    // channel with request-handling tasks.
    let (_connection, channel) = open(config).await?;

    ensure_topology(&channel).await?;

    channel
        .basic_qos(config.prefetch_count, BasicQosOptions::default())
        .await
        .map_err(|e| HeraldError::Connection(format!("QoS setup failed: {}", e)))?;

    let mut streams: Vec<DeliveryStream> = Vec::with_capacity(handlers.len());
    for (queue, handler) in handlers {
        let consumer = channel
            .basic_consume(
                queue,
                &format!("herald-{}", Uuid::new_v4()),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                HeraldError::Connection(format!("consumer setup failed for {}: {}", queue, e))
            })?;

        info!(queue = %queue, "Consumer registered");

        let queue = queue.clone();
        let handler = handler.clone();
        streams.push(Box::pin(
            consumer.map(move |result| (queue.clone(), handler.clone(), result)),
        ));
    }

    info!(queues = handlers.len(), "Consuming");

    // Single-task cooperative dispatch across all registered queues.
    let mut deliveries = select_all(streams);
    while let Some((queue, handler, result)) = deliveries.next().await {
        let delivery = result.map_err(|e| {
            HeraldError::Connection(format!("consumer error on {}: {}", queue, e))
        })?;
        dispatch(&queue, &handler, delivery).await;
    }

    Err(HeraldError::Connection(
        "consume streams ended".to_string(),
    ))
}

/// Deserialize, invoke the handler, then ack or nack.
///
/// Handler and deserialization failures are confined to the delivery:
/// the message is nacked with requeue and the loop keeps serving other
/// messages and queues. A message whose handler always fails is
/// redelivered indefinitely; there is no dead-letter routing.
async fn dispatch(queue: &str, handler: &QueueHandler, delivery: Delivery) {
    let routing_key = delivery.routing_key.as_str().to_string();

    let message = match serde_json::from_slice::<NotificationMessage>(&delivery.data) {
        Ok(message) => message,
        Err(e) => {
            error!(queue, routing_key, error = %e, "Failed to deserialize message body");
            nack(&delivery, queue).await;
            return;
        }
    };

    let notification_id = message.notification_id.clone();
    match handler(message, routing_key.clone()).await {
        Ok(()) => {
            if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                warn!(queue, notification_id = %notification_id, error = %e, "Ack failed");
            }
        }
        Err(e) => {
            error!(
                queue,
                routing_key,
                notification_id = %notification_id,
                error = %e,
                "Handler failed, message nacked"
            );
            nack(&delivery, queue).await;
        }
    }
}

async fn nack(delivery: &Delivery, queue: &str) {
    // requeue matches the broker-default redelivery the source relied on
    let options = BasicNackOptions {
        requeue: true,
        ..Default::default()
    };
    if let Err(e) = delivery.nack(options).await {
        warn!(queue, error = %e, "Nack failed");
    }
}
