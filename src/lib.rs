//! # Herald
//!
//! Notification fan-out over RabbitMQ.
//!
//! A notification request is expanded into one delivery event per
//! channel; each event is published to a durable direct exchange with a
//! routing key derived from its severity and channel, and consumed from
//! a fixed set of queues by supervised handlers with crash-only
//! recovery.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use herald::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = NotificationService::new(RabbitConfig::default());
//!     service.initialize().await;
//!
//!     let request = NotificationRequest {
//!         user_id: 42,
//!         message: "your invoice is ready".to_string(),
//!         category: Category::InvoiceReady,
//!         severity: Some(Severity::Critical),
//!         channels: Some(vec![Channel::Email, Channel::Sms]),
//!         metadata: None,
//!     };
//!
//!     for event in request.expand() {
//!         service.publish(&event).await;
//!     }
//!
//!     service.shutdown().await;
//! }
//! ```

pub mod prelude;

pub use herald_core::{
    derive_routing_key, Category, Channel, HeraldError, NotificationEvent, NotificationMessage,
    NotificationRequest, QueueHandler, Severity,
};

pub use herald_rabbitmq::{
    ensure_topology, ConnectionManager, ConnectionState, ConsumerSupervisor, NotificationService,
    Publisher, RabbitConfig, SupervisorHandle, NOTIFICATION_EXCHANGE, QUEUE_BINDINGS,
};
