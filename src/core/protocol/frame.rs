// src/core/protocol/frame.rs

//! Implements the event-frame structure exchanged with clients and the
//! corresponding `Encoder` and `Decoder` for network communication.
//!
//! A frame is a 4-byte big-endian length prefix followed by a JSON body
//! carrying the namespace, the event name, an opaque payload, and an optional
//! acknowledgment id.

use crate::core::ServerError;
use crate::core::namespace::Namespace;
use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder};

/// The size of the big-endian length prefix.
const PREFIX_LEN: usize = 4;

/// A single multiplexed event on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    /// The namespace this event belongs to.
    pub namespace: Namespace,
    /// The event name; reserved names cover connect/disconnect/command
    /// traffic, anything else is a named data channel.
    pub event: String,
    /// The event payload, opaque at this layer.
    #[serde(default)]
    pub payload: Value,
    /// Acknowledgment id, echoed back with the outcome of a control command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
}

impl EventFrame {
    pub fn new(namespace: Namespace, event: impl Into<String>, payload: Value) -> Self {
        Self {
            namespace,
            event: event.into(),
            payload,
            ack: None,
        }
    }

    pub fn with_ack(mut self, ack: u64) -> Self {
        self.ack = Some(ack);
        self
    }
}

/// A `tokio_util::codec` implementation for encoding and decoding
/// `EventFrame`s.
///
/// The decoder enforces the configured message-size ceiling; an oversized
/// length prefix fails the frame before any body bytes are buffered.
#[derive(Debug)]
pub struct EventFrameCodec {
    /// Maximum allowed frame body size in bytes.
    max_frame_bytes: usize,
}

impl EventFrameCodec {
    pub fn new(max_frame_bytes: usize) -> Self {
        // The wire prefix is a u32; a larger ceiling is not representable.
        Self {
            max_frame_bytes: max_frame_bytes.min(u32::MAX as usize),
        }
    }
}

impl Encoder<EventFrame> for EventFrameCodec {
    type Error = ServerError;

    fn encode(&mut self, item: EventFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = serde_json::to_vec(&item)?;
        // The ceiling applies in both directions; it also keeps the length
        // prefix within u32 range.
        if body.len() > self.max_frame_bytes {
            return Err(ServerError::FrameTooLarge {
                size: body.len(),
                limit: self.max_frame_bytes,
            });
        }
        dst.reserve(PREFIX_LEN + body.len());
        dst.put_u32(body.len() as u32);
        dst.extend_from_slice(&body);
        Ok(())
    }
}

impl Decoder for EventFrameCodec {
    type Item = EventFrame;
    type Error = ServerError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < PREFIX_LEN {
            return Ok(None);
        }

        let mut prefix = [0u8; PREFIX_LEN];
        prefix.copy_from_slice(&src[..PREFIX_LEN]);
        let body_len = u32::from_be_bytes(prefix) as usize;

        if body_len > self.max_frame_bytes {
            return Err(ServerError::FrameTooLarge {
                size: body_len,
                limit: self.max_frame_bytes,
            });
        }

        if src.len() < PREFIX_LEN + body_len {
            // Need more data; reserve enough for the rest of this frame.
            src.reserve(PREFIX_LEN + body_len - src.len());
            return Ok(None);
        }

        src.advance(PREFIX_LEN);
        let body = src.split_to(body_len);
        let frame: EventFrame = serde_json::from_slice(&body)
            .map_err(|e| ServerError::Protocol(format!("Malformed event frame: {e}")))?;
        Ok(Some(frame))
    }
}
