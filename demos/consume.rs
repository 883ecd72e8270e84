//! Run the consumer side of the notification system
//!
//! Registers a logging handler per queue (the per-channel handlers of
//! the original delivery workers) and runs the supervised consume loop
//! until ctrl-c. Requires RabbitMQ on localhost:5672.
//!
//! Run with: cargo run --example consume

use std::collections::HashMap;
use std::sync::Arc;

use herald::prelude::*;
use tracing::info;

fn logging_handler(kind: &'static str) -> QueueHandler {
    Arc::new(move |message, routing_key| {
        Box::pin(async move {
            info!(
                kind,
                routing_key,
                notification_id = %message.notification_id,
                user_id = message.user_id,
                category = %message.category,
                "Processing notification"
            );
            Ok(())
        })
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let service = NotificationService::new(RabbitConfig::default());
    service.initialize().await;

    let mut handlers: HashMap<String, QueueHandler> = HashMap::new();
    handlers.insert("critical_email_queue".to_string(), logging_handler("email"));
    handlers.insert(
        "noncritical_email_queue".to_string(),
        logging_handler("email"),
    );
    handlers.insert("critical_sms_queue".to_string(), logging_handler("sms"));
    handlers.insert("noncritical_sms_queue".to_string(), logging_handler("sms"));
    handlers.insert("critical_push_queue".to_string(), logging_handler("push"));
    handlers.insert("noncritical_push_queue".to_string(), logging_handler("push"));

    service.start_consumers(handlers).await;
    println!("Consuming all notification queues, ctrl-c to stop");

    tokio::signal::ctrl_c().await.expect("ctrl-c handler");
    service.shutdown().await;
}
