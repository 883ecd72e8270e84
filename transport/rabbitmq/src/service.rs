//! Service facade wiring connection, topology, publishing and consumption

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use herald_core::{NotificationEvent, QueueHandler};

use crate::config::RabbitConfig;
use crate::connection::ConnectionManager;
use crate::consumer::{ConsumerSupervisor, SupervisorHandle};
use crate::publisher::Publisher;
use crate::topology::ensure_topology;

/// The messaging layer as seen by its collaborators.
///
/// Constructed once at process start and shared by reference: the
/// request-handling boundary calls [`publish`](Self::publish) per
/// derived event, process startup calls
/// [`initialize`](Self::initialize) and
/// [`start_consumers`](Self::start_consumers), and process shutdown
/// calls [`shutdown`](Self::shutdown).
pub struct NotificationService {
    config: RabbitConfig,
    connection: Arc<ConnectionManager>,
    publisher: Publisher,
    supervisor: Mutex<Option<SupervisorHandle>>,
}

impl NotificationService {
    pub fn new(config: RabbitConfig) -> Self {
        let connection = Arc::new(ConnectionManager::new(config.clone()));
        let publisher = Publisher::new(connection.clone());
        Self {
            config,
            connection,
            publisher,
            supervisor: Mutex::new(None),
        }
    }

    /// The shared publish-side connection handle.
    pub fn connection(&self) -> Arc<ConnectionManager> {
        self.connection.clone()
    }

    /// Connect and establish the broker topology.
    ///
    /// Returns `false` on failure; the caller may retry or rely on the
    /// consumer supervisor, which re-runs topology setup on every
    /// iteration.
    pub async fn initialize(&self) -> bool {
        let channel = match self.connection.channel().await {
            Ok(channel) => channel,
            Err(e) => {
                error!(error = %e, "Initialization failed: no connection");
                return false;
            }
        };

        if let Err(e) = ensure_topology(&channel).await {
            error!(error = %e, "Initialization failed: topology setup");
            return false;
        }

        info!("Notification service initialized");
        true
    }

    /// Publish one event. Fire-and-forget; see [`Publisher::publish`].
    pub async fn publish(&self, event: &NotificationEvent) -> bool {
        self.publisher.publish(event).await
    }

    /// Start the consumer supervisor with the given queue handlers on a
    /// dedicated background task. A second call while consumers are
    /// already running is ignored.
    pub async fn start_consumers(&self, handlers: HashMap<String, QueueHandler>) {
        let mut slot = self.supervisor.lock().await;
        if slot.is_some() {
            warn!("Consumers already running, ignoring start request");
            return;
        }

        let mut supervisor = ConsumerSupervisor::new(self.config.clone());
        for (queue, handler) in handlers {
            supervisor.register(queue, handler);
        }

        *slot = Some(supervisor.spawn());
        info!("Consumer supervisor started");
    }

    /// Stop consuming and close the connection, best-effort.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.supervisor.lock().await.take() {
            handle.shutdown().await;
        }
        self.connection.close().await;
        info!("Notification service shut down");
    }
}
