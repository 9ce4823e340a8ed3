// src/core/transport.rs

//! The transport collaborator boundary.
//!
//! The core consumes exactly these primitives and does not depend on wire
//! framing details. The in-crate implementation lives in
//! `connection::registry`; tests substitute recording stubs.

use crate::core::errors::ServerError;
use crate::core::identity::SessionId;
use crate::core::namespace::Namespace;
use async_trait::async_trait;
use serde_json::Value;

/// Emit, message, and disconnect primitives scoped to one namespace session.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Emits a named event with a structured payload to one session.
    async fn emit(
        &self,
        event: &str,
        namespace: Namespace,
        to: SessionId,
        payload: Value,
    ) -> Result<(), ServerError>;

    /// Sends a plain-text message to one session.
    async fn send_text(
        &self,
        namespace: Namespace,
        to: SessionId,
        text: &str,
    ) -> Result<(), ServerError>;

    /// Forcibly disconnects one namespace session.
    async fn disconnect(&self, namespace: Namespace, sid: SessionId) -> Result<(), ServerError>;
}
