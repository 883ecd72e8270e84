//! Consumer handler types

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::HeraldError;
use crate::event::NotificationMessage;

/// Callback invoked for every message delivered on a queue.
///
/// Receives the deserialized message and the routing key it was
/// delivered with. Returning an error triggers a negative acknowledgment
/// and broker redelivery; returning `Ok` acknowledges the message.
pub type QueueHandler = Arc<
    dyn Fn(NotificationMessage, String) -> Pin<Box<dyn Future<Output = Result<(), HeraldError>> + Send>>
        + Send
        + Sync,
>;
