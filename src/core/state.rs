// src/core/state.rs

//! The composition root shared by all connection tasks.

use crate::config::Config;
use crate::core::channels::ChannelDispatcher;
use crate::core::dispatcher::CommandDispatcher;
use crate::core::emitter::Emitter;
use crate::core::handlers::CallbackSet;
use crate::core::identity::IdentityMapper;
use crate::core::lifecycle::LifecycleHandler;
use crate::core::transport::Transport;
use std::sync::Arc;

/// Holds the state shared across all concurrently executing handlers.
///
/// The configuration and callback set are read-only after server start; the
/// identity mapper is the only structure mutated from multiple connection
/// tasks.
pub struct ServerState {
    pub config: Config,
    pub identity: Arc<IdentityMapper>,
    pub transport: Arc<dyn Transport>,
    pub channels: Arc<dyn ChannelDispatcher>,
    pub lifecycle: LifecycleHandler,
    pub dispatcher: CommandDispatcher,
    pub emitter: Emitter,
}

impl ServerState {
    /// Wires the lifecycle, dispatcher, and emitter around the supplied
    /// collaborators. Registration is one-time; the resulting state is
    /// treated as immutable configuration by every handler.
    pub fn initialize(
        config: Config,
        identity: Arc<IdentityMapper>,
        transport: Arc<dyn Transport>,
        channels: Arc<dyn ChannelDispatcher>,
        callbacks: CallbackSet,
    ) -> Arc<Self> {
        let lifecycle = LifecycleHandler::new(
            identity.clone(),
            transport.clone(),
            callbacks.disconnect.clone(),
            config.disconnect_on_unhandled,
        );
        let dispatcher = CommandDispatcher::new(
            identity.clone(),
            transport.clone(),
            callbacks.command.clone(),
            config.disconnect_on_unhandled,
        );
        let emitter = Emitter::new(transport.clone(), channels.clone());

        Arc::new(Self {
            config,
            identity,
            transport,
            channels,
            lifecycle,
            dispatcher,
            emitter,
        })
    }
}
