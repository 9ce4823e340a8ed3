// src/core/lifecycle.rs

//! Per-namespace session lifecycle: connect and disconnect handling.

use crate::core::handlers::DisconnectHandler;
use crate::core::identity::{ConnectionId, IdentityMapper, SessionId};
use crate::core::namespace::Namespace;
use crate::core::transport::Transport;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Reacts to per-namespace connect and disconnect events.
///
/// Each (connection, namespace) pair moves ABSENT -> CONNECTED -> ABSENT; the
/// two namespaces of one connection are created and destroyed independently,
/// and the lifecycle of one never implicitly touches the other.
pub struct LifecycleHandler {
    identity: Arc<IdentityMapper>,
    transport: Arc<dyn Transport>,
    disconnect: Arc<dyn DisconnectHandler>,
    disconnect_on_unhandled: bool,
}

impl LifecycleHandler {
    pub fn new(
        identity: Arc<IdentityMapper>,
        transport: Arc<dyn Transport>,
        disconnect: Arc<dyn DisconnectHandler>,
        disconnect_on_unhandled: bool,
    ) -> Self {
        Self {
            identity,
            transport,
            disconnect,
            disconnect_on_unhandled,
        }
    }

    /// Records a new namespace session for the connection and welcomes it.
    ///
    /// The identity mapper is bound before anything is logged or sent, so
    /// both lookup directions are already consistent at connect time. The
    /// welcome text is observable liveness confirmation only and does not
    /// affect application state.
    pub async fn on_connect(
        &self,
        namespace: Namespace,
        connection_id: ConnectionId,
        metadata: Option<&Value>,
    ) -> SessionId {
        let session_id = SessionId::new();
        self.identity.bind(namespace, connection_id, session_id);
        info!(
            "Client {connection_id} connected to {namespace} namespace {session_id}, metadata {:?}",
            metadata
        );
        let welcome = format!("You are connected to {namespace} namespace {session_id}");
        if let Err(e) = self
            .transport
            .send_text(namespace, session_id, &welcome)
            .await
        {
            debug!("Dropping welcome message for {session_id}: {e}");
        }
        session_id
    }

    /// Tears down the namespace session of a connection.
    ///
    /// For the data namespace the registered disconnect handler runs to
    /// completion first, while the session is still resolvable through the
    /// identity mapper; this is its last chance to query identity or emit
    /// final data. The control namespace is a thin command channel with no
    /// application resources to release and gets no user hook.
    pub async fn on_disconnect(&self, namespace: Namespace, connection_id: ConnectionId) {
        let Ok(session_id) = self.identity.session_id_for(connection_id, namespace) else {
            debug!("Disconnect for {connection_id} on {namespace} with no live session");
            return;
        };

        if namespace == Namespace::Data
            && let Err(e) = self.disconnect.handle(session_id).await
        {
            error!("Disconnect handler failed for session {session_id}: {e}");
            if self.disconnect_on_unhandled {
                // The session is being torn down anyway; the containment
                // measure reduces to making the failure visible.
                warn!("Unhandled disconnect-handler error for {session_id}");
            }
        }

        self.identity.unbind(namespace, connection_id);
        info!("Client {connection_id} disconnected from {namespace} namespace, sid {session_id}");
    }
}
