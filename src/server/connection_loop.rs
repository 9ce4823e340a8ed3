// src/server/connection_loop.rs

//! Contains the main server loop for accepting connections and handling
//! signal-driven shutdown.

use super::context::ServerContext;
use crate::connection::ConnectionHandler;
use crate::core::identity::ConnectionId;
use anyhow::anyhow;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info, warn};

/// The main server loop that accepts connections and handles shutdown.
pub async fn run(mut ctx: ServerContext) {
    let mut connection_id_counter: u64 = 0;

    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow!("Failed to register SIGINT handler: {}", e))
        .expect("Failed to create SIGINT stream");
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow!("Failed to register SIGTERM handler: {}", e))
        .expect("Failed to create SIGTERM stream");

    loop {
        tokio::select! {
            biased;

            _ = sigint.recv() => {
                info!("SIGINT received, initiating shutdown.");
                break;
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received, initiating shutdown.");
                break;
            }

            res = ctx.listener.accept() => {
                match res {
                    Ok((socket, addr)) => {
                        let Ok(permit) = ctx.connection_permits.clone().try_acquire_owned() else {
                            warn!("Max clients reached, rejecting connection from {addr}");
                            drop(socket);
                            continue;
                        };

                        info!("Accepted new connection from: {}", addr);
                        connection_id_counter = connection_id_counter.wrapping_add(1);
                        let connection_id = ConnectionId(connection_id_counter);

                        let queues = ctx.registry.register(connection_id);
                        let state = ctx.state.clone();
                        let registry = ctx.registry.clone();
                        let global_shutdown_rx = ctx.shutdown_tx.subscribe();

                        ctx.client_tasks.spawn(async move {
                            let _permit = permit;
                            let mut handler = ConnectionHandler::new(
                                socket,
                                addr,
                                state,
                                registry,
                                connection_id,
                                queues,
                                global_shutdown_rx,
                            );
                            if let Err(e) = handler.run().await {
                                warn!("Connection from {} terminated unexpectedly: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                }
            },

            Some(res) = ctx.client_tasks.join_next() => {
                if let Err(e) = res
                    && e.is_panic()
                {
                    error!("A client handler panicked: {e:?}");
                }
            },
        }
    }

    info!("Shutting down. Sending signal to all tasks.");
    if ctx.shutdown_tx.send(()).is_err() {
        info!("No live connections to signal.");
    }

    ctx.client_tasks.shutdown().await;
    info!("All client connections closed. Server shutdown complete.");
}
