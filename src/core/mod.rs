// src/core/mod.rs

//! The central module containing the core logic and data structures of duplexd.

pub mod channels;
pub mod command;
pub mod dispatcher;
pub mod emitter;
pub mod errors;
pub mod handlers;
pub mod identity;
pub mod lifecycle;
pub mod namespace;
pub mod protocol;
pub mod state;
pub mod transport;

pub use command::{CommandOutcome, ControlCommand};
pub use errors::ServerError;
pub use identity::{ConnectionId, SessionId};
pub use namespace::Namespace;
