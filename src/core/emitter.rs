// src/core/emitter.rs

//! Uniform entry points for pushing data and command-error notifications to
//! sessions, abstracting the transport and channel-dispatch collaborators.

use crate::core::channels::{ChannelDispatcher, ChannelKind};
use crate::core::errors::ServerError;
use crate::core::identity::SessionId;
use crate::core::namespace::{COMMAND_ERROR_EVENT, Namespace};
use crate::core::transport::Transport;
use bytes::Bytes;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

/// The data/error emission facade.
pub struct Emitter {
    transport: Arc<dyn Transport>,
    channels: Arc<dyn ChannelDispatcher>,
}

impl Emitter {
    pub fn new(transport: Arc<dyn Transport>, channels: Arc<dyn ChannelDispatcher>) -> Self {
        Self {
            transport,
            channels,
        }
    }

    /// Emits a structured `{error: message}` payload on the control namespace.
    ///
    /// Side effect only. A call targeting a session that already disconnected
    /// is dropped: disconnect and in-flight emission can interleave and the
    /// race is benign. The call never resurrects identity state.
    pub async fn send_command_error(&self, message: &str, sid: SessionId) {
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

    /// Pass-through delegation of structured outbound data to the
    /// channel-dispatch collaborator.
    pub async fn send_data(
        &self,
        payload: Value,
        event: &str,
        kind: ChannelKind,
        sid: SessionId,
    ) -> Result<(), ServerError> {
        self.channels.send_data(payload, event, kind, sid).await
    }

    /// Pass-through delegation of an outbound image frame to the
    /// channel-dispatch collaborator.
    pub async fn send_image(
        &self,
        frame: Bytes,
        event: &str,
        kind: ChannelKind,
        timestamp: u64,
        metadata: Option<Value>,
        sid: SessionId,
    ) -> Result<(), ServerError> {
        self.channels
            .send_image(frame, event, kind, timestamp, metadata, sid)
            .await
    }
}
