//! RabbitMQ messaging layer for the herald notification system
//!
//! Provides the broker-facing half of the system:
//! - Durable direct-exchange topology with fixed queue bindings
//! - Connection lifecycle with bounded-retry reconnection
//! - Persistent, fire-and-forget event publishing
//! - Supervised multi-queue consumption with crash-only recovery

pub mod config;
pub mod connection;
pub mod consumer;
pub mod prelude;
pub mod publisher;
pub mod service;
pub mod topology;

pub use config::RabbitConfig;
pub use connection::{ConnectionManager, ConnectionState};
pub use consumer::{ConsumerSupervisor, SupervisorHandle};
pub use publisher::Publisher;
pub use service::NotificationService;
pub use topology::{ensure_topology, NOTIFICATION_EXCHANGE, QUEUE_BINDINGS};
