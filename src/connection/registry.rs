// src/connection/registry.rs

//! Tracks live connections, their outbound frame queues, and their disconnect
//! channels.
//!
//! The registry is the in-crate transport implementation: emission resolves a
//! namespace session back to its connection and enqueues a frame on that
//! connection's bounded queue. The queue capacity is the configured
//! backpressure threshold; a full queue rejects the frame instead of blocking,
//! so no emission path can ever stall a connection task on its own queue.
//!
//! Disconnect instructions travel on a separate unbounded channel. A session
//! slated for teardown is typically one whose frame queue is already full, so
//! containment must never compete with data frames for queue capacity.

use crate::core::errors::ServerError;
use crate::core::identity::{ConnectionId, IdentityMapper, SessionId};
use crate::core::namespace::{MESSAGE_EVENT, Namespace};
use crate::core::protocol::EventFrame;
use crate::core::transport::Transport;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// The sending halves of one connection's channels.
struct ConnectionChannels {
    frames: mpsc::Sender<EventFrame>,
    disconnects: mpsc::UnboundedSender<Namespace>,
}

/// The receiving halves handed to a connection task at registration.
pub struct ConnectionQueues {
    /// Outbound frames, bounded by the backpressure threshold.
    pub frames: mpsc::Receiver<EventFrame>,
    /// Namespace teardown instructions, never subject to backpressure.
    pub disconnects: mpsc::UnboundedReceiver<Namespace>,
}

/// The live-connection table: one channel pair per open connection.
pub struct ConnectionRegistry {
    identity: Arc<IdentityMapper>,
    senders: DashMap<ConnectionId, ConnectionChannels>,
    back_pressure_size: usize,
}

impl ConnectionRegistry {
    pub fn new(identity: Arc<IdentityMapper>, back_pressure_size: usize) -> Self {
        Self {
            identity,
            senders: DashMap::new(),
            back_pressure_size,
        }
    }

    /// Registers a new connection and returns the receiving ends of its
    /// channels. Called by the accept loop before the connection task starts.
    pub fn register(&self, connection_id: ConnectionId) -> ConnectionQueues {
        let (frame_tx, frame_rx) = mpsc::channel(self.back_pressure_size);
        let (disconnect_tx, disconnect_rx) = mpsc::unbounded_channel();
        self.senders.insert(
            connection_id,
            ConnectionChannels {
                frames: frame_tx,
                disconnects: disconnect_tx,
            },
        );
        ConnectionQueues {
            frames: frame_rx,
            disconnects: disconnect_rx,
        }
    }

    /// Drops a connection's channels. Any queued frames are discarded; whether
    /// buffered data should be flushed first is deliberately left undefined.
    pub fn unregister(&self, connection_id: ConnectionId) {
        self.senders.remove(&connection_id);
    }

    /// Number of currently registered connections.
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Enqueues a frame for a connection without blocking.
    ///
    /// A missing or closed queue is a benign race with disconnect; a full
    /// queue means the backpressure threshold is reached. Both reject the
    /// frame with a [`ServerError::Transport`] for the caller to drop or log.
    pub fn push(&self, connection_id: ConnectionId, frame: EventFrame) -> Result<(), ServerError> {
        // Clone the sender out of the map so no shard lock is held while the
        // queue is touched.
        let sender = self
            .senders
            .get(&connection_id)
            .map(|entry| entry.frames.clone())
            .ok_or_else(|| {
                ServerError::Transport(format!("Connection {connection_id} is gone"))
            })?;

        sender.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                warn!("Backpressure limit reached for connection {connection_id}, dropping frame");
                ServerError::Transport(format!(
                    "Backpressure limit reached for connection {connection_id}"
                ))
            }
            mpsc::error::TrySendError::Closed(_) => {
                ServerError::Transport(format!("Connection {connection_id} is gone"))
            }
        })
    }

    /// Instructs a connection task to tear down one of its namespace sessions.
    ///
    /// Delivered on the unbounded disconnect channel: a full frame queue must
    /// never let a session escape a forced teardown. Fails only when the
    /// connection itself is already gone.
    pub fn request_disconnect(
        &self,
        connection_id: ConnectionId,
        namespace: Namespace,
    ) -> Result<(), ServerError> {
        let sender = self
            .senders
            .get(&connection_id)
            .map(|entry| entry.disconnects.clone())
            .ok_or_else(|| {
                ServerError::Transport(format!("Connection {connection_id} is gone"))
            })?;

        sender.send(namespace).map_err(|_| {
            ServerError::Transport(format!("Connection {connection_id} is gone"))
        })
    }

    fn resolve(&self, namespace: Namespace, sid: SessionId) -> Result<ConnectionId, ServerError> {
        self.identity.connection_id_for(sid, namespace)
    }
}

#[async_trait]
impl Transport for ConnectionRegistry {
    async fn emit(
        &self,
        event: &str,
        namespace: Namespace,
        to: SessionId,
        payload: Value,
    ) -> Result<(), ServerError> {
        let connection_id = self.resolve(namespace, to)?;
        let frame = EventFrame::new(namespace, event, payload);
        self.push(connection_id, frame)
    }

    async fn send_text(
        &self,
        namespace: Namespace,
        to: SessionId,
        text: &str,
    ) -> Result<(), ServerError> {
        self.emit(MESSAGE_EVENT, namespace, to, Value::String(text.to_string()))
            .await
    }

    async fn disconnect(&self, namespace: Namespace, sid: SessionId) -> Result<(), ServerError> {
        let connection_id = self.resolve(namespace, sid)?;
        debug!("Requesting disconnect of {namespace} session {sid} on {connection_id}");
        self.request_disconnect(connection_id, namespace)
    }
}
