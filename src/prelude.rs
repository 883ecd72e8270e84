//! Prelude module for convenient imports

pub use herald_core::prelude::*;
pub use herald_rabbitmq::prelude::*;
