//! Core types for the herald notification fan-out system

pub mod errors;
pub mod event;
pub mod handler;
pub mod prelude;

pub use errors::HeraldError;
pub use event::{
    derive_routing_key, Category, Channel, NotificationEvent, NotificationMessage,
    NotificationRequest, Severity,
};
pub use handler::QueueHandler;
