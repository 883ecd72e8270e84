//! Prelude module for convenient imports

pub use crate::config::RabbitConfig;
pub use crate::connection::{ConnectionManager, ConnectionState};
pub use crate::consumer::{ConsumerSupervisor, SupervisorHandle};
pub use crate::publisher::Publisher;
pub use crate::service::NotificationService;
pub use crate::topology::{ensure_topology, NOTIFICATION_EXCHANGE, QUEUE_BINDINGS};
