//! Broker topology: the notification exchange and its queue bindings

use lapin::{
    options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions},
    types::FieldTable,
    Channel, ExchangeKind,
};
use tracing::{error, info};

use herald_core::HeraldError;

/// The single direct exchange all notification events are published to.
pub const NOTIFICATION_EXCHANGE: &str = "notification_exchange";

/// Fixed (queue, routing key) bindings: the cross product of
/// `{critical, non_critical} x {email, sms, push}`.
///
/// `in_app` is deliberately absent. Events carrying an `in_app` routing
/// key are accepted by the exchange, match no binding, and are dropped
/// by the broker. This reproduces the source system's behavior; it is a
/// gap, not a design choice.
pub const QUEUE_BINDINGS: [(&str, &str); 6] = [
    ("critical_email_queue", "critical.email"),
    ("critical_sms_queue", "critical.sms"),
    ("critical_push_queue", "critical.push"),
    ("noncritical_email_queue", "non_critical.email"),
    ("noncritical_sms_queue", "non_critical.sms"),
    ("noncritical_push_queue", "non_critical.push"),
];

/// Declare the exchange and all queue bindings on the given channel.
///
/// Idempotent: identical re-declarations are broker no-ops; conflicting
/// parameters against an existing declaration fail the channel. Any
/// single failure aborts the sequence and the caller must re-run the
/// whole setup.
pub async fn ensure_topology(channel: &Channel) -> Result<(), HeraldError> {
    channel
        .exchange_declare(
            NOTIFICATION_EXCHANGE,
            ExchangeKind::Direct,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| {
            error!(exchange = NOTIFICATION_EXCHANGE, error = %e, "Exchange declaration failed");
            HeraldError::Topology(format!("exchange declaration failed: {}", e))
        })?;

    for (queue, routing_key) in QUEUE_BINDINGS {
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                error!(queue, error = %e, "Queue declaration failed");
                HeraldError::Topology(format!("queue declaration failed for {}: {}", queue, e))
            })?;

        channel
            .queue_bind(
                queue,
                NOTIFICATION_EXCHANGE,
                routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                error!(queue, routing_key, error = %e, "Queue bind failed");
                HeraldError::Topology(format!("queue bind failed for {}: {}", queue, e))
            })?;

        info!(queue, routing_key, "Queue bound");
    }

    info!(exchange = NOTIFICATION_EXCHANGE, "Topology established");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use herald_core::{derive_routing_key, Channel, Severity};

    use super::*;

    #[test]
    fn bindings_cover_the_severity_channel_cross_product() {
        let bound: HashSet<&str> = QUEUE_BINDINGS.iter().map(|(_, key)| *key).collect();

        let expected: HashSet<String> = [Severity::Critical, Severity::NonCritical]
            .into_iter()
            .flat_map(|severity| {
                [Channel::Email, Channel::Sms, Channel::Push]
                    .into_iter()
                    .map(move |channel| derive_routing_key(severity, channel))
            })
            .collect();

        assert_eq!(bound.len(), 6);
        assert_eq!(
            bound,
            expected.iter().map(String::as_str).collect::<HashSet<_>>()
        );
    }

    #[test]
    fn each_queue_is_bound_exactly_once() {
        let queues: HashSet<&str> = QUEUE_BINDINGS.iter().map(|(queue, _)| *queue).collect();
        assert_eq!(queues.len(), QUEUE_BINDINGS.len());
    }

    #[test]
    fn in_app_is_never_bound() {
        for severity in [Severity::Critical, Severity::NonCritical] {
            let key = derive_routing_key(severity, Channel::InApp);
            assert!(QUEUE_BINDINGS.iter().all(|(_, bound)| *bound != key));
        }
    }
}
