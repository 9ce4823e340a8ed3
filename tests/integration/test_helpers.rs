// tests/integration/test_helpers.rs

//! Test helpers and utilities for integration tests

use duplexd::SessionServer;
use duplexd::config::Config;
use duplexd::core::Namespace;
use duplexd::core::channels::CallbackInfo;
use duplexd::core::handlers::{CommandHandler, DisconnectHandler};
use duplexd::core::identity::SessionId;
use duplexd::core::namespace::{CONNECT_EVENT, MESSAGE_EVENT};
use duplexd::core::protocol::{EventFrame, EventFrameCodec};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// A running server on a loopback listener, plus a handle for server-side
/// pushes.
pub struct TestServer {
    pub server: Arc<SessionServer>,
    pub addr: SocketAddr,
}

impl TestServer {
    /// Starts a server on a free loopback port with the given channels and
    /// callbacks and waits until it accepts connections.
    pub async fn start(
        callbacks_info: HashMap<String, CallbackInfo>,
        command_callback: Option<Arc<dyn CommandHandler>>,
        disconnect_callback: Option<Arc<dyn DisconnectHandler>>,
    ) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("warn"))
            .with_test_writer()
            .try_init();

        let config = Config {
            host: "127.0.0.1".into(),
            port: free_port().await,
            ..Config::default()
        };
        let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse().unwrap();

        let server = Arc::new(
            SessionServer::new(config, callbacks_info, command_callback, disconnect_callback)
                .expect("Failed to build test server"),
        );
        let runner = server.clone();
        tokio::spawn(async move {
            let _ = runner.run().await;
        });

        // The listener binds asynchronously; probe until it answers.
        for _ in 0..50 {
            if TcpStream::connect(addr).await.is_ok() {
                return Self { server, addr };
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("Test server at {addr} never came up");
    }
}

/// Picks a free loopback port by binding an ephemeral listener and dropping
/// it.
async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind an ephemeral port");
    listener.local_addr().unwrap().port()
}

/// A framed TCP client speaking the event-frame protocol.
pub struct TestClient {
    framed: Framed<TcpStream, EventFrameCodec>,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let socket = TcpStream::connect(addr)
            .await
            .expect("Failed to connect to test server");
        let codec = EventFrameCodec::new(Config::default().max_frame_bytes());
        Self {
            framed: Framed::new(socket, codec),
        }
    }

    pub async fn send(&mut self, frame: EventFrame) {
        self.framed.send(frame).await.expect("Failed to send frame");
    }

    /// Receives the next frame, failing the test after a timeout.
    pub async fn recv(&mut self) -> EventFrame {
        tokio::time::timeout(RECV_TIMEOUT, self.framed.next())
            .await
            .expect("Timed out waiting for a frame")
            .expect("Server closed the connection")
            .expect("Server sent an undecodable frame")
    }

    /// Opens a namespace and returns the session id announced by the welcome
    /// message.
    pub async fn open(&mut self, namespace: Namespace) -> SessionId {
        self.send(EventFrame::new(namespace, CONNECT_EVENT, json!({})))
            .await;
        let welcome = self.recv().await;
        assert_eq!(welcome.namespace, namespace);
        assert_eq!(welcome.event, MESSAGE_EVENT);
        let text = welcome
            .payload
            .as_str()
            .expect("Welcome payload is not text");
        assert!(text.contains(namespace.as_str()), "unexpected welcome: {text}");
        let sid = text
            .rsplit(' ')
            .next()
            .and_then(|token| Uuid::parse_str(token).ok())
            .expect("Welcome message carries no session id");
        SessionId(sid)
    }
}
