// src/core/dispatcher.rs

//! The control-protocol dispatcher: parse, dispatch, report.

use crate::core::command::{CommandOutcome, ControlCommand};
use crate::core::handlers::CommandHandler;
use crate::core::identity::{IdentityMapper, SessionId};
use crate::core::namespace::{COMMAND_ERROR_EVENT, Namespace};
use crate::core::transport::Transport;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Parses inbound control payloads, dispatches them to the resolved command
/// handler, and reports a uniform outcome for every inbound command.
///
/// Stateless across events; one invocation fully consumes one command event.
pub struct CommandDispatcher {
    identity: Arc<IdentityMapper>,
    transport: Arc<dyn Transport>,
    handler: Arc<dyn CommandHandler>,
    disconnect_on_unhandled: bool,
}

impl CommandDispatcher {
    pub fn new(
        identity: Arc<IdentityMapper>,
        transport: Arc<dyn Transport>,
        handler: Arc<dyn CommandHandler>,
        disconnect_on_unhandled: bool,
    ) -> Self {
        Self {
            identity,
            transport,
            handler,
            disconnect_on_unhandled,
        }
    }

    /// Handles one inbound control payload from the given control session.
    ///
    /// A structural mismatch is the only path that proactively notifies the
    /// client: exactly one command-error event is pushed and the handler is
    /// never invoked. Dispatch-level failures are reported solely via the
    /// returned outcome, which the transport's acknowledgment mechanism
    /// relays. There is no retry; a negative outcome is terminal for the
    /// event and the client is responsible for resubmission.
    pub async fn dispatch(&self, raw: Value, sid: SessionId) -> CommandOutcome {
        let command = match ControlCommand::parse(raw) {
            Ok(command) => command,
            Err(e) => {
                let message = e.to_string();
                error!("{message} (control session {sid})");
                self.push_command_error(&message, sid).await;
                return CommandOutcome::rejected(message);
            }
        };

        let connection = self
            .identity
            .connection_id_for(sid, Namespace::Control)
            .map(|id| id.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        info!(
            "Control command {} parsed, connection {connection}, sid {sid}",
            command.cmd_type
        );

        match self.handler.handle(command, sid).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Control command handler failed for session {sid}: {e}");
                if self.disconnect_on_unhandled {
                    warn!("Force-disconnecting control session {sid} after unhandled error");
                    if let Err(e) = self.transport.disconnect(Namespace::Control, sid).await {
                        debug!("Force-disconnect of {sid} failed: {e}");
                    }
                }
                CommandOutcome::rejected(format!("Control command handler failed: {e}"))
            }
        }
    }

    /// Best-effort push of a structured command-error event. A session gone
    /// mid-flight is a benign race and the emission is simply dropped.
    async fn push_command_error(&self, message: &str, sid: SessionId) {
        if let Err(e) = self
            .transport
            .emit(
                COMMAND_ERROR_EVENT,
                Namespace::Control,
                sid,
                json!({ "error": message }),
            )
            .await
        {
            debug!("Dropping command-error event for gone session {sid}: {e}");
        }
    }
}
