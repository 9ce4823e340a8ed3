// src/connection/handler.rs

//! Defines the `ConnectionHandler` which manages the full lifecycle of a
//! client connection and routes its multiplexed events.

use super::registry::{ConnectionQueues, ConnectionRegistry};
use crate::core::ServerError;
use crate::core::identity::ConnectionId;
use crate::core::namespace::{ACK_EVENT, COMMAND_EVENT, CONNECT_EVENT, DISCONNECT_EVENT, Namespace};
use crate::core::protocol::{EventFrame, EventFrameCodec};
use crate::core::state::ServerState;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// Manages the full lifecycle of a client connection.
///
/// One handler task per accepted socket. Events from one connection arrive
/// and are dispatched in arrival order; with `async_handlers` enabled,
/// command and data-channel dispatch is spawned per event instead, trading
/// per-connection serialization for handler concurrency.
pub struct ConnectionHandler {
    framed: Framed<TcpStream, EventFrameCodec>,
    addr: SocketAddr,
    state: Arc<ServerState>,
    registry: Arc<ConnectionRegistry>,
    connection_id: ConnectionId,
    outbound_rx: mpsc::Receiver<EventFrame>,
    disconnect_rx: mpsc::UnboundedReceiver<Namespace>,
    global_shutdown_rx: broadcast::Receiver<()>,
}

impl ConnectionHandler {
    pub fn new(
        socket: TcpStream,
        addr: SocketAddr,
        state: Arc<ServerState>,
        registry: Arc<ConnectionRegistry>,
        connection_id: ConnectionId,
        queues: ConnectionQueues,
        global_shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        let codec = EventFrameCodec::new(state.config.max_frame_bytes());
        Self {
            framed: Framed::new(socket, codec),
            addr,
            state,
            registry,
            connection_id,
            outbound_rx: queues.frames,
            disconnect_rx: queues.disconnects,
            global_shutdown_rx,
        }
    }

    /// The main event loop for the connection, handling incoming frames,
    /// outbound instructions, and shutdown signals.
    pub async fn run(&mut self) -> Result<(), ServerError> {
        'main_loop: loop {
            tokio::select! {
                // Prioritize shutdown signals over other events.
                biased;
                _ = self.global_shutdown_rx.recv() => {
                    info!("Connection handler for {} received shutdown signal.", self.addr);
                    break 'main_loop;
                }
                // Teardown instructions outrank queued frames so a full
                // outbound queue can never delay containment.
                namespace = self.disconnect_rx.recv() => {
                    match namespace {
                        Some(namespace) => {
                            self.state
                                .lifecycle
                                .on_disconnect(namespace, self.connection_id)
                                .await;
                        }
                        None => break 'main_loop,
                    }
                }
                outbound = self.outbound_rx.recv() => {
                    match outbound {
                        Some(frame) => {
                            debug!("Connection {}: Sending frame: {:?}", self.connection_id, frame);
                            if let Err(e) = self.framed.send(frame).await {
                                warn!("Write to {} failed: {}", self.addr, e);
                                break 'main_loop;
                            }
                        }
                        None => break 'main_loop,
                    }
                }
                result = self.framed.next() => {
                    match result {
                        Some(Ok(frame)) => {
                            debug!("Connection {}: Received frame: {:?}", self.connection_id, frame);
                            if let Err(e) = self.process_frame(frame).await {
                                warn!("Connection error for {}: {}", self.addr, e);
                                break 'main_loop;
                            }
                        }
                        Some(Err(e)) => {
                            if is_normal_disconnect(&e) {
                                debug!("Connection from {} closed by peer: {}", self.addr, e);
                            } else {
                                warn!("Connection error for {}: {}", self.addr, e);
                            }
                            break 'main_loop;
                        }
                        None => {
                            debug!("Connection from {} closed by peer.", self.addr);
                            break 'main_loop;
                        }
                    }
                }
            }
        }

        // Full teardown: each namespace session this connection still holds is
        // closed independently, with data-namespace hook semantics preserved.
        for namespace in [Namespace::Data, Namespace::Control] {
            self.state
                .lifecycle
                .on_disconnect(namespace, self.connection_id)
                .await;
        }
        self.registry.unregister(self.connection_id);
        Ok(())
    }

    /// Routes one inbound frame by namespace and event name.
    async fn process_frame(&mut self, frame: EventFrame) -> Result<(), ServerError> {
        match (frame.namespace, frame.event.as_str()) {
            (namespace, CONNECT_EVENT) => {
                if self
                    .state
                    .identity
                    .session_id_for(self.connection_id, namespace)
                    .is_ok()
                {
                    warn!(
                        "Connection {} is already connected to {namespace}, ignoring connect",
                        self.connection_id
                    );
                    return Ok(());
                }
                self.state
                    .lifecycle
                    .on_connect(namespace, self.connection_id, Some(&frame.payload))
                    .await;
                Ok(())
            }
            (namespace, DISCONNECT_EVENT) => {
                self.state
                    .lifecycle
                    .on_disconnect(namespace, self.connection_id)
                    .await;
                Ok(())
            }
            (Namespace::Control, COMMAND_EVENT) => self.process_command(frame).await,
            (Namespace::Control, event) => {
                warn!(
                    "Unknown control event '{event}' from connection {}, ignoring",
                    self.connection_id
                );
                Ok(())
            }
            (Namespace::Data, event) => self.process_channel_message(event.to_string(), frame).await,
        }
    }

    /// Handles one control command frame, acknowledging it if requested.
    async fn process_command(&mut self, frame: EventFrame) -> Result<(), ServerError> {
        let sid = match self
            .state
            .identity
            .session_id_for(self.connection_id, Namespace::Control)
        {
            Ok(sid) => sid,
            Err(e) => {
                warn!(
                    "Command from connection {} before control connect: {e}",
                    self.connection_id
                );
                if let Some(ack) = frame.ack {
                    let outcome = json!({
                        "accepted": false,
                        "message": "Not connected to the control namespace",
                    });
                    let reply =
                        EventFrame::new(Namespace::Control, ACK_EVENT, outcome).with_ack(ack);
                    self.framed.send(reply).await?;
                }
                return Ok(());
            }
        };

        if self.state.config.async_handlers {
            let state = self.state.clone();
            let registry = self.registry.clone();
            let connection_id = self.connection_id;
            tokio::spawn(async move {
                let outcome = state.dispatcher.dispatch(frame.payload, sid).await;
                if let Some(ack) = frame.ack {
                    let reply = EventFrame::new(
                        Namespace::Control,
                        ACK_EVENT,
                        json!({ "accepted": outcome.accepted, "message": outcome.message }),
                    )
                    .with_ack(ack);
                    if let Err(e) = registry.push(connection_id, reply) {
                        debug!("Dropping ack for connection {connection_id}: {e}");
                    }
                }
            });
            return Ok(());
        }

        let outcome = self.state.dispatcher.dispatch(frame.payload, sid).await;
        if let Some(ack) = frame.ack {
            let reply = EventFrame::new(
                Namespace::Control,
                ACK_EVENT,
                json!({ "accepted": outcome.accepted, "message": outcome.message }),
            )
            .with_ack(ack);
            self.framed.send(reply).await?;
        }
        Ok(())
    }

    /// Routes one inbound data-channel message to the channel collaborator.
    async fn process_channel_message(
        &mut self,
        event: String,
        frame: EventFrame,
    ) -> Result<(), ServerError> {
        let sid = match self
            .state
            .identity
            .session_id_for(self.connection_id, Namespace::Data)
        {
            Ok(sid) => sid,
            Err(e) => {
                warn!(
                    "Data event '{event}' from connection {} before data connect: {e}",
                    self.connection_id
                );
                return Ok(());
            }
        };

        if self.state.config.async_handlers {
            let state = self.state.clone();
            tokio::spawn(async move {
                state.channels.handle_message(&event, sid, frame.payload).await;
            });
        } else {
            self.state
                .channels
                .handle_message(&event, sid, frame.payload)
                .await;
        }
        Ok(())
    }
}

/// Helper function to check for non-critical disconnection errors.
fn is_normal_disconnect(e: &ServerError) -> bool {
    matches!(e, ServerError::Io(arc_err) if matches!(
        arc_err.kind(),
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionAborted
    ))
}
