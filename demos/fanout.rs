//! Publish a notification fan-out
//!
//! Expands one request into per-channel events and publishes each to
//! the notification exchange. Requires RabbitMQ on localhost:5672.
//!
//! Run with: cargo run --example fanout

use std::collections::HashMap;

use herald::prelude::*;
use serde_json::json;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let service = NotificationService::new(RabbitConfig::default());
    if !service.initialize().await {
        eprintln!("RabbitMQ is not reachable, giving up");
        return;
    }

    let mut metadata = HashMap::new();
    metadata.insert("invoice_id".to_string(), json!("INV-1207"));

    let request = NotificationRequest {
        user_id: 42,
        message: "Your invoice is ready for download".to_string(),
        category: Category::InvoiceReady,
        severity: Some(Severity::Critical),
        channels: Some(vec![Channel::Email, Channel::Sms, Channel::Push]),
        metadata: Some(metadata),
    };

    for event in request.expand() {
        let sent = service.publish(&event).await;
        println!(
            "{} {} -> {}",
            if sent { "sent" } else { "LOST" },
            event.notification_id,
            event.routing_key()
        );
    }

    service.shutdown().await;
}
