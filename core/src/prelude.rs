//! Prelude module for convenient imports

pub use crate::errors::HeraldError;
pub use crate::event::{
    derive_routing_key, Category, Channel, NotificationEvent, NotificationMessage,
    NotificationRequest, Severity,
};
pub use crate::handler::QueueHandler;
