// src/connection/mod.rs

//! Per-connection event handling and the live-connection registry.

mod handler;
mod registry;

pub use handler::ConnectionHandler;
pub use registry::{ConnectionQueues, ConnectionRegistry};
