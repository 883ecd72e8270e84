//! Event publishing

use std::sync::Arc;

use lapin::{options::BasicPublishOptions, BasicProperties};
use tracing::{error, info};

use herald_core::{NotificationEvent, NotificationMessage};

use crate::connection::ConnectionManager;
use crate::topology::NOTIFICATION_EXCHANGE;

/// Publishes notification events to the exchange.
///
/// Fire-and-forget: a failed publish is logged and reported as `false`,
/// and the event is lost unless the caller re-derives and resends it.
/// There is no retry queue or outbox.
pub struct Publisher {
    connection: Arc<ConnectionManager>,
}

impl Publisher {
    pub fn new(connection: Arc<ConnectionManager>) -> Self {
        Self { connection }
    }

    /// Publish one event with its derived routing key.
    ///
    /// Returns `true` only when the send completed without a transport
    /// or channel error; never panics and never returns an error. May be
    /// called concurrently from many request-handling tasks.
    pub async fn publish(&self, event: &NotificationEvent) -> bool {
        let channel = match self.connection.channel().await {
            Ok(channel) => channel,
            Err(e) => {
                error!(
                    notification_id = %event.notification_id,
                    error = %e,
                    "No connection available, event not published"
                );
                return false;
            }
        };

        let message = NotificationMessage::from_event(event);
        let payload = match serde_json::to_vec(&message) {
            Ok(payload) => payload,
            Err(e) => {
                error!(
                    notification_id = %event.notification_id,
                    error = %e,
                    "Failed to serialize event"
                );
                return false;
            }
        };

        let properties = BasicProperties::default()
            .with_delivery_mode(2) // persistent
            .with_content_type("application/json".into());

        let routing_key = event.routing_key();
        let result = channel
            .basic_publish(
                NOTIFICATION_EXCHANGE,
                routing_key,
                BasicPublishOptions::default(),
                &payload,
                properties,
            )
            .await;

        let confirm = match result {
            Ok(confirm) => confirm,
            Err(e) => {
                error!(
                    exchange = NOTIFICATION_EXCHANGE,
                    routing_key,
                    notification_id = %event.notification_id,
                    error = %e,
                    "Failed to publish event"
                );
                return false;
            }
        };

        if let Err(e) = confirm.await {
            error!(
                exchange = NOTIFICATION_EXCHANGE,
                routing_key,
                notification_id = %event.notification_id,
                error = %e,
                "Failed to confirm publish"
            );
            return false;
        }

        info!(
            exchange = NOTIFICATION_EXCHANGE,
            routing_key,
            notification_id = %event.notification_id,
            channel = %event.channel,
            "Event published"
        );
        true
    }
}
