//! Event types for the notification fan-out system

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Urgency level of a notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    NonCritical,
}

impl Severity {
    /// Canonical string form, used everywhere the severity is serialized
    /// or embedded in a routing key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::NonCritical => "non_critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery channel for a notification.
///
/// Note: `in_app` has no queue bound to it in the broker topology (see
/// `herald_rabbitmq::topology`). Events routed with it are accepted by
/// the exchange, match no binding, and are dropped by the broker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Sms,
    Push,
    InApp,
}

impl Channel {
    /// Canonical string form, used everywhere the channel is serialized
    /// or embedded in a routing key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::Push => "push",
            Channel::InApp => "in_app",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business category of a notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    PaymentSuccess,
    PaymentFailed,
    InvoiceReady,
    RepairRequest,
    RepairUpdate,
    MaintenanceAlert,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::PaymentSuccess => "payment_success",
            Category::PaymentFailed => "payment_failed",
            Category::InvoiceReady => "invoice_ready",
            Category::RepairRequest => "repair_request",
            Category::RepairUpdate => "repair_update",
            Category::MaintenanceAlert => "maintenance_alert",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated notification request, as handed over by the request
/// boundary after it has persisted its own record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub user_id: i64,
    pub message: String,
    pub category: Category,
    /// Defaults to [`Severity::NonCritical`] when absent.
    #[serde(default)]
    pub severity: Option<Severity>,
    /// Defaults to `[email]` when absent or empty.
    #[serde(default)]
    pub channels: Option<Vec<Channel>>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, Value>>,
}

impl NotificationRequest {
    /// Expand the request into one delivery event per requested channel.
    ///
    /// Pure function: no I/O. All events of one call share a freshly
    /// generated `notification_id`; they are independent for delivery
    /// and acknowledgment purposes.
    pub fn expand(&self) -> Vec<NotificationEvent> {
        let notification_id = Uuid::new_v4().to_string();
        let severity = self.severity.unwrap_or(Severity::NonCritical);
        let metadata = self.metadata.clone().unwrap_or_default();

        let channels: Vec<Channel> = match &self.channels {
            Some(channels) if !channels.is_empty() => channels.clone(),
            _ => vec![Channel::Email],
        };

        channels
            .into_iter()
            .map(|channel| {
                NotificationEvent::new(
                    notification_id.clone(),
                    self.user_id,
                    severity,
                    channel,
                    self.message.clone(),
                    self.category,
                    metadata.clone(),
                )
            })
            .collect()
    }
}

/// One delivery event for a single (notification, channel) pair.
///
/// The routing key is derived once at construction and cannot be set
/// independently: `routing_key == severity + "." + channel`.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationEvent {
    pub notification_id: String,
    pub user_id: i64,
    pub severity: Severity,
    pub channel: Channel,
    pub message: String,
    pub category: Category,
    pub metadata: HashMap<String, Value>,
    routing_key: String,
}

impl NotificationEvent {
    pub fn new(
        notification_id: String,
        user_id: i64,
        severity: Severity,
        channel: Channel,
        message: String,
        category: Category,
        metadata: HashMap<String, Value>,
    ) -> Self {
        let routing_key = derive_routing_key(severity, channel);
        Self {
            notification_id,
            user_id,
            severity,
            channel,
            message,
            category,
            metadata,
            routing_key,
        }
    }

    /// Routing key the event is published with.
    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }
}

/// Derive the routing key for a (severity, channel) pair.
pub fn derive_routing_key(severity: Severity, channel: Channel) -> String {
    format!("{}.{}", severity.as_str(), channel.as_str())
}

/// Wire envelope for a published event: the event fields plus the
/// wall-clock send timestamp injected at publish time. This is the type
/// consumers deserialize from the message body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub notification_id: String,
    pub user_id: i64,
    pub severity: Severity,
    pub channel: Channel,
    pub message: String,
    pub category: Category,
    pub metadata: HashMap<String, Value>,
    pub routing_key: String,
    /// Epoch seconds at publish time.
    pub timestamp: i64,
}

impl NotificationMessage {
    /// Build the wire envelope for an event, stamping it with the
    /// current wall-clock time.
    pub fn from_event(event: &NotificationEvent) -> Self {
        Self {
            notification_id: event.notification_id.clone(),
            user_id: event.user_id,
            severity: event.severity,
            channel: event.channel,
            message: event.message.clone(),
            category: event.category,
            metadata: event.metadata.clone(),
            routing_key: event.routing_key().to_string(),
            timestamp: Utc::now().timestamp(),
        }
    }
}
