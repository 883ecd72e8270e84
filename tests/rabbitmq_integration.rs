//! RabbitMQ integration tests
//!
//! Tests marked #[ignore] require a running RabbitMQ server on
//! localhost:5672. Run with: cargo test --test rabbitmq_integration -- --ignored

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::time::{timeout, Duration};

use herald::prelude::*;

fn unreachable_config() -> RabbitConfig {
    // Port 1 is closed; a single attempt fails fast.
    RabbitConfig {
        host: "127.0.0.1".to_string(),
        port: 1,
        connection_attempts: 1,
        retry_delay_seconds: 0,
        ..RabbitConfig::default()
    }
}

fn local_config() -> RabbitConfig {
    RabbitConfig {
        connection_attempts: 3,
        retry_delay_seconds: 1,
        restart_delay_seconds: 1,
        ..RabbitConfig::default()
    }
}

fn sample_request(severity: Option<Severity>, channels: Option<Vec<Channel>>) -> NotificationRequest {
    NotificationRequest {
        user_id: 42,
        message: "payment received".to_string(),
        category: Category::PaymentSuccess,
        severity,
        channels,
        metadata: None,
    }
}

#[tokio::test]
async fn publish_without_broker_returns_false() {
    let service = NotificationService::new(unreachable_config());

    let events = sample_request(Some(Severity::Critical), Some(vec![Channel::Email])).expand();
    assert_eq!(events.len(), 1);

    assert!(!service.publish(&events[0]).await);

    // The manager fell back to Disconnected rather than wedging.
    assert_eq!(
        service.connection().state().await,
        ConnectionState::Disconnected
    );
}

#[tokio::test]
async fn initialize_without_broker_returns_false() {
    let service = NotificationService::new(unreachable_config());
    assert!(!service.initialize().await);
}

#[tokio::test]
#[ignore]
async fn ensure_connection_is_idempotent() {
    let manager = ConnectionManager::new(local_config());

    manager
        .ensure_connection()
        .await
        .expect("first connect succeeds");
    assert_eq!(manager.state().await, ConnectionState::Connected);

    // Second call returns without a new connection attempt.
    manager
        .ensure_connection()
        .await
        .expect("second call is a no-op");
    assert_eq!(manager.state().await, ConnectionState::Connected);

    manager.close().await;
    assert_eq!(manager.state().await, ConnectionState::Disconnected);
}

#[tokio::test]
#[ignore]
async fn topology_setup_is_idempotent() {
    let manager = ConnectionManager::new(local_config());
    let channel = manager.channel().await.expect("connected");

    ensure_topology(&channel).await.expect("first setup");
    ensure_topology(&channel).await.expect("second setup is a no-op");

    manager.close().await;
}

#[tokio::test]
#[ignore]
async fn critical_fanout_is_consumed_per_channel() {
    let service = NotificationService::new(local_config());
    assert!(service.initialize().await);

    let email_count = Arc::new(AtomicU32::new(0));
    let sms_count = Arc::new(AtomicU32::new(0));

    let mut handlers: HashMap<String, QueueHandler> = HashMap::new();
    let ec = email_count.clone();
    handlers.insert(
        "critical_email_queue".to_string(),
        Arc::new(move |message, routing_key| {
            let count = ec.clone();
            Box::pin(async move {
                assert_eq!(routing_key, "critical.email");
                assert_eq!(message.channel, Channel::Email);
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }),
    );
    let sc = sms_count.clone();
    handlers.insert(
        "critical_sms_queue".to_string(),
        Arc::new(move |message, routing_key| {
            let count = sc.clone();
            Box::pin(async move {
                assert_eq!(routing_key, "critical.sms");
                assert_eq!(message.channel, Channel::Sms);
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }),
    );

    service.start_consumers(handlers).await;
    tokio::time::sleep(Duration::from_millis(500)).await;

    let events = sample_request(
        Some(Severity::Critical),
        Some(vec![Channel::Email, Channel::Sms]),
    )
    .expand();
    assert_eq!(events.len(), 2);
    for event in &events {
        assert!(service.publish(event).await, "publish failed");
    }

    let result = timeout(Duration::from_secs(5), async {
        while email_count.load(Ordering::SeqCst) < 1 || sms_count.load(Ordering::SeqCst) < 1 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await;

    assert!(result.is_ok(), "fan-out was not consumed on both queues");
    service.shutdown().await;
}

#[tokio::test]
#[ignore]
async fn failing_handler_nacks_without_crashing_the_supervisor() {
    let service = NotificationService::new(local_config());
    assert!(service.initialize().await);

    let email_failures = Arc::new(AtomicU32::new(0));
    let sms_successes = Arc::new(AtomicU32::new(0));

    let mut handlers: HashMap<String, QueueHandler> = HashMap::new();
    let ef = email_failures.clone();
    handlers.insert(
        "critical_email_queue".to_string(),
        Arc::new(move |_, _| {
            let failures = ef.clone();
            Box::pin(async move {
                failures.fetch_add(1, Ordering::SeqCst);
                Err(HeraldError::Handler("email provider down".to_string()))
            })
        }),
    );
    let ss = sms_successes.clone();
    handlers.insert(
        "critical_sms_queue".to_string(),
        Arc::new(move |_, _| {
            let successes = ss.clone();
            Box::pin(async move {
                successes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }),
    );

    service.start_consumers(handlers).await;
    tokio::time::sleep(Duration::from_millis(500)).await;

    let events = sample_request(
        Some(Severity::Critical),
        Some(vec![Channel::Email, Channel::Sms]),
    )
    .expand();
    for event in &events {
        assert!(service.publish(event).await, "publish failed");
    }

    // The nacked email message is redelivered; the sms queue keeps
    // being served by the same loop.
    let result = timeout(Duration::from_secs(5), async {
        while email_failures.load(Ordering::SeqCst) < 2 || sms_successes.load(Ordering::SeqCst) < 1
        {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await;

    assert!(
        result.is_ok(),
        "failing handler stalled redelivery or starved other queues"
    );
    service.shutdown().await;
}

#[tokio::test]
#[ignore]
async fn default_request_routes_to_noncritical_email() {
    let service = NotificationService::new(local_config());
    assert!(service.initialize().await);

    let received = Arc::new(AtomicU32::new(0));
    let rc = received.clone();

    let mut handlers: HashMap<String, QueueHandler> = HashMap::new();
    handlers.insert(
        "noncritical_email_queue".to_string(),
        Arc::new(move |message, routing_key| {
            let count = rc.clone();
            Box::pin(async move {
                assert_eq!(routing_key, "non_critical.email");
                assert_eq!(message.severity, Severity::NonCritical);
                assert!(message.timestamp > 0);
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }),
    );

    service.start_consumers(handlers).await;
    tokio::time::sleep(Duration::from_millis(500)).await;

    let events = sample_request(None, None).expand();
    assert_eq!(events.len(), 1);
    assert!(service.publish(&events[0]).await);

    let result = timeout(Duration::from_secs(5), async {
        while received.load(Ordering::SeqCst) < 1 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await;

    assert!(result.is_ok(), "default-routed event was not consumed");
    service.shutdown().await;
}
