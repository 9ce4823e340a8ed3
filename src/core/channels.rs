// src/core/channels.rs

//! The channel-dispatch collaborator boundary.
//!
//! Named data/result channels, their handling specification, and the
//! dispatcher interface that owns payload encoding/decoding, backpressure
//! thresholding, and coder recreation. The server core only forwards calls
//! and configuration values to it verbatim.

use crate::core::errors::ServerError;
use crate::core::identity::SessionId;
use crate::core::namespace::Namespace;
use crate::core::transport::Transport;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use strum_macros::{Display, EnumString};
use tracing::{debug, warn};

/// The payload encoding of a named channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Json,
    JsonLz4,
    Jpeg,
    H264,
    Hevc,
}

/// Handles one decoded inbound message on a named channel.
#[async_trait]
pub trait DataHandler: Send + Sync {
    async fn on_message(&self, session_id: SessionId, data: Value);
}

/// Handles a decode failure on a named channel.
#[async_trait]
pub trait ErrorHandler: Send + Sync {
    async fn on_error(&self, session_id: SessionId, error: ServerError);
}

/// The handling specification of one named channel.
#[derive(Clone)]
pub struct CallbackInfo {
    /// The kind of decoded message the channel carries.
    pub kind: ChannelKind,
    pub handler: Arc<dyn DataHandler>,
    pub error_handler: Option<Arc<dyn ErrorHandler>>,
}

impl CallbackInfo {
    pub fn new(kind: ChannelKind, handler: Arc<dyn DataHandler>) -> Self {
        Self {
            kind,
            handler,
            error_handler: None,
        }
    }

    pub fn with_error_handler(mut self, error_handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = Some(error_handler);
        self
    }
}

/// Configuration values owned by the collaborator, forwarded verbatim from
/// the server configuration.
#[derive(Debug, Clone, Copy)]
pub struct ChannelSettings {
    /// Max outstanding outbound messages per client.
    pub back_pressure_size: usize,
    /// Coder-recreation retry budget.
    pub recreate_coder_attempts_count: u32,
    /// Whether to record output data sizes.
    pub stats: bool,
}

/// Receives outbound data for encoding and emission, and routes decoded
/// inbound channel messages to their registered callbacks.
#[async_trait]
pub trait ChannelDispatcher: Send + Sync {
    /// Encodes and emits a structured payload on a named channel.
    async fn send_data(
        &self,
        payload: Value,
        event: &str,
        kind: ChannelKind,
        sid: SessionId,
    ) -> Result<(), ServerError>;

    /// Encodes and emits an image frame on a named channel.
    async fn send_image(
        &self,
        frame: Bytes,
        event: &str,
        kind: ChannelKind,
        timestamp: u64,
        metadata: Option<Value>,
        sid: SessionId,
    ) -> Result<(), ServerError>;

    /// Routes one inbound channel message to its registered callback.
    async fn handle_message(&self, event: &str, sid: SessionId, payload: Value);
}

/// The in-crate default collaborator: a JSON pass-through.
///
/// Payloads are emitted as-is and inbound events are routed to the registered
/// callbacks without any re-encoding. Real codecs (LZ4, JPEG, H264) and
/// backpressure accounting beyond the bounded outbound queue belong to a full
/// collaborator implementation plugged in behind [`ChannelDispatcher`]; the
/// settings are stored here so such an implementation receives them verbatim.
pub struct PassthroughChannels {
    transport: Arc<dyn Transport>,
    callbacks_info: HashMap<String, CallbackInfo>,
    settings: ChannelSettings,
}

impl PassthroughChannels {
    pub fn new(
        transport: Arc<dyn Transport>,
        callbacks_info: HashMap<String, CallbackInfo>,
        settings: ChannelSettings,
    ) -> Self {
        Self {
            transport,
            callbacks_info,
            settings,
        }
    }

    pub fn settings(&self) -> ChannelSettings {
        self.settings
    }
}

#[async_trait]
impl ChannelDispatcher for PassthroughChannels {
    async fn send_data(
        &self,
        payload: Value,
        event: &str,
        _kind: ChannelKind,
        sid: SessionId,
    ) -> Result<(), ServerError> {
        self.transport
            .emit(event, Namespace::Data, sid, payload)
            .await
    }

    async fn send_image(
        &self,
        frame: Bytes,
        event: &str,
        _kind: ChannelKind,
        timestamp: u64,
        metadata: Option<Value>,
        sid: SessionId,
    ) -> Result<(), ServerError> {
        let mut envelope = json!({
            "frame": hex::encode(&frame),
            "timestamp": timestamp,
        });
        if let Some(metadata) = metadata {
            envelope["metadata"] = metadata;
        }
        self.transport
            .emit(event, Namespace::Data, sid, envelope)
            .await
    }

    async fn handle_message(&self, event: &str, sid: SessionId, payload: Value) {
        let Some(info) = self.callbacks_info.get(event) else {
            warn!("No channel registered for event '{event}', dropping message from {sid}");
            return;
        };
        debug!("Routing '{event}' ({}) message from {sid}", info.kind);
        info.handler.on_message(sid, payload).await;
    }
}
