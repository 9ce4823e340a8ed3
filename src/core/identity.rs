// src/core/identity.rs

//! Maps transport connection identities to their per-namespace sessions.

use crate::core::errors::ServerError;
use crate::core::namespace::Namespace;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// An identifier for one physical transport-level connection, assigned by the
/// accept loop. Unique while the connection is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An identifier for a client's membership in one namespace, minted on that
/// namespace's connect. Meaningful only within its namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The owned, encapsulated correlation between connections and their
/// per-namespace sessions.
///
/// Both directions are updated together on connect and disconnect so they can
/// never diverge. Mutations for a given connection happen only from that
/// connection's task; per-key atomicity of the underlying maps is the only
/// synchronization required, and no lock is ever held across keys. Raw
/// iteration is deliberately not exposed.
#[derive(Debug, Default)]
pub struct IdentityMapper {
    /// `(namespace, connection)` -> session.
    sessions: DashMap<(Namespace, ConnectionId), SessionId>,
    /// `(namespace, session)` -> connection.
    connections: DashMap<(Namespace, SessionId), ConnectionId>,
}

impl IdentityMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the namespace session created for a connection, in both
    /// directions.
    pub fn bind(&self, namespace: Namespace, connection_id: ConnectionId, session_id: SessionId) {
        self.sessions.insert((namespace, connection_id), session_id);
        self.connections
            .insert((namespace, session_id), connection_id);
    }

    /// Removes the namespace session of a connection from both directions.
    /// Returns the removed session id, if any.
    pub fn unbind(&self, namespace: Namespace, connection_id: ConnectionId) -> Option<SessionId> {
        let (_, session_id) = self.sessions.remove(&(namespace, connection_id))?;
        self.connections.remove(&(namespace, session_id));
        Some(session_id)
    }

    /// Looks up the session created for `connection_id` within `namespace`.
    ///
    /// Fails with [`ServerError::NotFound`] if the connection never joined
    /// that namespace or already left it.
    pub fn session_id_for(
        &self,
        connection_id: ConnectionId,
        namespace: Namespace,
    ) -> Result<SessionId, ServerError> {
        self.sessions
            .get(&(namespace, connection_id))
            .map(|entry| *entry.value())
            .ok_or(ServerError::NotFound {
                namespace,
                id: connection_id.to_string(),
            })
    }

    /// Inverse lookup, scoped by namespace to avoid id collisions across
    /// namespaces. Same failure mode as [`Self::session_id_for`].
    pub fn connection_id_for(
        &self,
        session_id: SessionId,
        namespace: Namespace,
    ) -> Result<ConnectionId, ServerError> {
        self.connections
            .get(&(namespace, session_id))
            .map(|entry| *entry.value())
            .ok_or(ServerError::NotFound {
                namespace,
                id: session_id.to_string(),
            })
    }
}
