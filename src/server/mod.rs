// src/server/mod.rs

use crate::config::Config;
use crate::connection::ConnectionRegistry;
use crate::core::channels::{
    CallbackInfo, ChannelDispatcher, ChannelKind, ChannelSettings, PassthroughChannels,
};
use crate::core::errors::ServerError;
use crate::core::handlers::{CallbackSet, CommandHandler, DisconnectHandler};
use crate::core::identity::{ConnectionId, IdentityMapper, SessionId};
use crate::core::namespace::Namespace;
use crate::core::state::ServerState;
use anyhow::Result;
use bytes::Bytes;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

mod connection_loop;
mod context;
mod initialization;

/// The embeddable session server.
///
/// Construction wires the identity mapper, connection registry, channel
/// collaborator, and the provided-or-default callback set; `run` binds the
/// listener and accepts connections until the process is terminated. How to
/// send data, e.g.:
///
/// ```ignore
/// server.send_image(frame, "image", ChannelKind::Jpeg, timestamp, metadata, sid).await?;
/// server.send_data(json!({"message": "message text"}), "event_name", ChannelKind::Json, sid).await?;
/// ```
pub struct SessionServer {
    state: Arc<ServerState>,
    registry: Arc<ConnectionRegistry>,
}

impl SessionServer {
    /// Creates a new server from a validated configuration, the named-channel
    /// specification, and optional command and data-disconnect callbacks.
    ///
    /// Handlers are resolved once, here: every call site afterwards invokes
    /// exactly one statically known handler value, either the user's or the
    /// concrete default. The callback set is immutable after this point.
    pub fn new(
        config: Config,
        callbacks_info: HashMap<String, CallbackInfo>,
        command_callback: Option<Arc<dyn CommandHandler>>,
        disconnect_callback: Option<Arc<dyn DisconnectHandler>>,
    ) -> Result<Self> {
        config.validate()?;

        let identity = Arc::new(IdentityMapper::new());
        let registry = Arc::new(ConnectionRegistry::new(
            identity.clone(),
            config.back_pressure_size,
        ));
        let channels: Arc<dyn ChannelDispatcher> = Arc::new(PassthroughChannels::new(
            registry.clone(),
            callbacks_info,
            ChannelSettings {
                back_pressure_size: config.back_pressure_size,
                recreate_coder_attempts_count: config.recreate_coder_attempts_count,
                stats: config.stats,
            },
        ));
        let callbacks = CallbackSet::resolve(command_callback, disconnect_callback);
        let state = ServerState::initialize(config, identity, registry.clone(), channels, callbacks);

        Ok(Self { state, registry })
    }

    /// Starts accepting connections and blocks until the process receives
    /// SIGINT or SIGTERM. No graceful in-process shutdown is defined;
    /// termination is a process-level concern.
    pub async fn run(&self) -> Result<()> {
        let ctx = initialization::setup(self.state.clone(), self.registry.clone()).await?;
        connection_loop::run(ctx).await;
        Ok(())
    }

    /// Looks up the session a connection holds in the given namespace.
    pub fn session_id_for(
        &self,
        connection_id: ConnectionId,
        namespace: Namespace,
    ) -> Result<SessionId, ServerError> {
        self.state.identity.session_id_for(connection_id, namespace)
    }

    /// Inverse lookup, scoped by namespace.
    pub fn connection_id_for(
        &self,
        session_id: SessionId,
        namespace: Namespace,
    ) -> Result<ConnectionId, ServerError> {
        self.state
            .identity
            .connection_id_for(session_id, namespace)
    }

    /// The data-namespace session of a connection.
    pub fn session_id_of_data(
        &self,
        connection_id: ConnectionId,
    ) -> Result<SessionId, ServerError> {
        self.session_id_for(connection_id, Namespace::Data)
    }

    /// The control-namespace session of a connection.
    pub fn session_id_of_control(
        &self,
        connection_id: ConnectionId,
    ) -> Result<SessionId, ServerError> {
        self.session_id_for(connection_id, Namespace::Control)
    }

    /// The connection behind a data-namespace session.
    pub fn connection_id_of_data(
        &self,
        session_id: SessionId,
    ) -> Result<ConnectionId, ServerError> {
        self.connection_id_for(session_id, Namespace::Data)
    }

    /// The connection behind a control-namespace session.
    pub fn connection_id_of_control(
        &self,
        session_id: SessionId,
    ) -> Result<ConnectionId, ServerError> {
        self.connection_id_for(session_id, Namespace::Control)
    }

    /// Sends a control command error message to a client. Best-effort; a
    /// session that disconnected mid-flight is silently skipped.
    pub async fn send_command_error(&self, message: &str, session_id: SessionId) {
        self.state.emitter.send_command_error(message, session_id).await;
    }

    /// Sends structured data to a session on a named channel.
    pub async fn send_data(
        &self,
        payload: Value,
        event: &str,
        kind: ChannelKind,
        session_id: SessionId,
    ) -> Result<(), ServerError> {
        self.state.emitter.send_data(payload, event, kind, session_id).await
    }

    /// Sends an image frame to a session on a named channel.
    #[allow(clippy::too_many_arguments)]
    pub async fn send_image(
        &self,
        frame: Bytes,
        event: &str,
        kind: ChannelKind,
        timestamp: u64,
        metadata: Option<Value>,
        session_id: SessionId,
    ) -> Result<(), ServerError> {
        self.state
            .emitter
            .send_image(frame, event, kind, timestamp, metadata, session_id)
            .await
    }
}

/// The main server startup function used by the binary: a server with no
/// registered channels or callbacks, running until terminated.
pub async fn run(config: Config) -> Result<()> {
    let server = SessionServer::new(config, HashMap::new(), None, None)?;
    server.run().await
}
