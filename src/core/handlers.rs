// src/core/handlers.rs

//! User-supplied callbacks and their provided-or-default resolution.

use crate::core::command::{CommandOutcome, ControlCommand};
use crate::core::errors::ServerError;
use crate::core::identity::SessionId;
use async_trait::async_trait;
use std::sync::Arc;

/// Handles one parsed control command.
///
/// Invoked with the command and the originating control-namespace session id.
/// Returning `Err` marks the event as unhandled; depending on configuration
/// this force-disconnects the offending session.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(
        &self,
        command: ControlCommand,
        session_id: SessionId,
    ) -> Result<CommandOutcome, ServerError>;
}

/// Handles a data-namespace disconnect.
///
/// Runs to completion before the session is removed from the identity mapper,
/// so the (still valid) session id can be used for final lookups or emission.
#[async_trait]
pub trait DisconnectHandler: Send + Sync {
    async fn handle(&self, session_id: SessionId) -> Result<(), ServerError>;
}

/// The default command handler: unconditionally reports acceptance, matching
/// the behavior a server exposes when no command callback is registered.
pub struct DefaultCommandHandler;

#[async_trait]
impl CommandHandler for DefaultCommandHandler {
    async fn handle(
        &self,
        _command: ControlCommand,
        _session_id: SessionId,
    ) -> Result<CommandOutcome, ServerError> {
        Ok(CommandOutcome::accepted("Control command callback applied"))
    }
}

/// The default data-namespace disconnect handler: a no-op.
pub struct NoopDisconnectHandler;

#[async_trait]
impl DisconnectHandler for NoopDisconnectHandler {
    async fn handle(&self, _session_id: SessionId) -> Result<(), ServerError> {
        Ok(())
    }
}

/// The process-wide callback set, resolved once at server construction and
/// immutable thereafter. Call sites always invoke exactly one, statically
/// known handler value: either the user's or the concrete default.
pub struct CallbackSet {
    pub command: Arc<dyn CommandHandler>,
    pub disconnect: Arc<dyn DisconnectHandler>,
}

impl CallbackSet {
    /// Resolves optional user handlers against the defaults.
    pub fn resolve(
        command: Option<Arc<dyn CommandHandler>>,
        disconnect: Option<Arc<dyn DisconnectHandler>>,
    ) -> Self {
        Self {
            command: command.unwrap_or_else(|| Arc::new(DefaultCommandHandler)),
            disconnect: disconnect.unwrap_or_else(|| Arc::new(NoopDisconnectHandler)),
        }
    }
}
