// src/core/errors.rs

//! Defines the primary error type for the entire application.

use crate::core::namespace::Namespace;
use std::sync::Arc;
use thiserror::Error;

/// The main error enum, representing all possible failures within the server.
/// Using `thiserror` allows for clean error definitions and automatic `From` trait implementations.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    /// An inbound control payload failed structural parsing. Recovered
    /// locally: surfaced to the client as a command-error event and a
    /// negative outcome, never fatal.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An identity lookup for a session or connection that does not exist in
    /// the queried namespace, either because it never joined or because it
    /// already disconnected.
    #[error("No {namespace} session found for '{id}'")]
    NotFound { namespace: Namespace, id: String },

    /// A user-supplied command or disconnect handler failed.
    #[error("Handler error: {0}")]
    Handler(String),

    /// A write to a session's connection failed, typically because the peer
    /// is already gone. Treated as best-effort by emission paths.
    #[error("Transport error: {0}")]
    Transport(String),

    /// An inbound frame exceeded the configured message-size ceiling.
    #[error("Frame of {size} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { size: usize, limit: usize },

    /// A malformed event frame or an event that is not valid for the
    /// namespace it arrived on.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

// Manual implementation of Clone because `std::io::Error` is not cloneable.
// We wrap it in an Arc to allow for cheap, shared cloning.
impl Clone for ServerError {
    fn clone(&self) -> Self {
        match self {
            ServerError::Io(e) => ServerError::Io(Arc::clone(e)),
            ServerError::Validation(s) => ServerError::Validation(s.clone()),
            ServerError::NotFound { namespace, id } => ServerError::NotFound {
                namespace: *namespace,
                id: id.clone(),
            },
            ServerError::Handler(s) => ServerError::Handler(s.clone()),
            ServerError::Transport(s) => ServerError::Transport(s.clone()),
            ServerError::FrameTooLarge { size, limit } => ServerError::FrameTooLarge {
                size: *size,
                limit: *limit,
            },
            ServerError::Protocol(s) => ServerError::Protocol(s.clone()),
            ServerError::Internal(s) => ServerError::Internal(s.clone()),
        }
    }
}

impl PartialEq for ServerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ServerError::Io(e1), ServerError::Io(e2)) => e1.to_string() == e2.to_string(),
            (ServerError::Validation(s1), ServerError::Validation(s2)) => s1 == s2,
            (
                ServerError::NotFound {
                    namespace: n1,
                    id: i1,
                },
                ServerError::NotFound {
                    namespace: n2,
                    id: i2,
                },
            ) => n1 == n2 && i1 == i2,
            (ServerError::Handler(s1), ServerError::Handler(s2)) => s1 == s2,
            (ServerError::Transport(s1), ServerError::Transport(s2)) => s1 == s2,
            (
                ServerError::FrameTooLarge {
                    size: s1,
                    limit: l1,
                },
                ServerError::FrameTooLarge {
                    size: s2,
                    limit: l2,
                },
            ) => s1 == s2 && l1 == l2,
            (ServerError::Protocol(s1), ServerError::Protocol(s2)) => s1 == s2,
            (ServerError::Internal(s1), ServerError::Internal(s2)) => s1 == s2,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

// --- From trait implementations for easy error conversion ---

impl From<std::io::Error> for ServerError {
    fn from(e: std::io::Error) -> Self {
        ServerError::Io(Arc::new(e))
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(e: serde_json::Error) -> Self {
        ServerError::Protocol(format!("JSON serialization/deserialization error: {e}"))
    }
}

impl From<uuid::Error> for ServerError {
    fn from(e: uuid::Error) -> Self {
        ServerError::Internal(format!("Failed to parse UUID: {e}"))
    }
}
