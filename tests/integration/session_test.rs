// tests/integration/session_test.rs

//! End-to-end session tests: connect, command round trips, data channels,
//! and per-namespace disconnect semantics.

use super::test_helpers::{TestClient, TestServer};
use async_trait::async_trait;
use duplexd::core::channels::{CallbackInfo, ChannelKind, DataHandler};
use duplexd::core::handlers::{CommandHandler, DisconnectHandler};
use duplexd::core::identity::SessionId;
use duplexd::core::namespace::{
    ACK_EVENT, COMMAND_ERROR_EVENT, COMMAND_EVENT, DISCONNECT_EVENT,
};
use duplexd::core::protocol::EventFrame;
use duplexd::core::{CommandOutcome, ControlCommand, Namespace, ServerError};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

struct CountingDisconnectHandler {
    calls: AtomicUsize,
}

#[async_trait]
impl DisconnectHandler for CountingDisconnectHandler {
    async fn handle(&self, _session_id: SessionId) -> Result<(), ServerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct EchoCommandHandler;

#[async_trait]
impl CommandHandler for EchoCommandHandler {
    async fn handle(
        &self,
        command: ControlCommand,
        _session_id: SessionId,
    ) -> Result<CommandOutcome, ServerError> {
        Ok(CommandOutcome::accepted(format!("echo {}", command.cmd_type)))
    }
}

/// Forwards every inbound channel message into an mpsc the test can await.
struct ForwardingDataHandler {
    tx: mpsc::UnboundedSender<(SessionId, Value)>,
}

#[async_trait]
impl DataHandler for ForwardingDataHandler {
    async fn on_message(&self, session_id: SessionId, data: Value) {
        let _ = self.tx.send((session_id, data));
    }
}

#[tokio::test]
async fn test_connect_both_namespaces_and_command_round_trip() {
    let ts = TestServer::start(HashMap::new(), None, None).await;
    let mut client = TestClient::connect(ts.addr).await;

    let control_sid = client.open(Namespace::Control).await;
    let data_sid = client.open(Namespace::Data).await;
    assert_ne!(control_sid, data_sid);

    client
        .send(
            EventFrame::new(Namespace::Control, COMMAND_EVENT, json!({"cmd_type": "ping"}))
                .with_ack(1),
        )
        .await;

    let ack = client.recv().await;
    assert_eq!(ack.namespace, Namespace::Control);
    assert_eq!(ack.event, ACK_EVENT);
    assert_eq!(ack.ack, Some(1));
    assert_eq!(ack.payload["accepted"], json!(true));
    assert_eq!(
        ack.payload["message"],
        json!("Control command callback applied")
    );
}

#[tokio::test]
async fn test_malformed_command_yields_error_event_and_rejected_ack() {
    let ts = TestServer::start(HashMap::new(), None, None).await;
    let mut client = TestClient::connect(ts.addr).await;
    client.open(Namespace::Control).await;

    client
        .send(
            EventFrame::new(Namespace::Control, COMMAND_EVENT, json!({"bogus": 1})).with_ack(2),
        )
        .await;

    // The rejected ack and the error event both arrive; order is not part of
    // the contract.
    let first = client.recv().await;
    let second = client.recv().await;
    let (ack, error) = if first.event == ACK_EVENT {
        (first, second)
    } else {
        (second, first)
    };

    assert_eq!(ack.ack, Some(2));
    assert_eq!(ack.payload["accepted"], json!(false));
    assert_eq!(error.event, COMMAND_ERROR_EVENT);
    assert_eq!(error.namespace, Namespace::Control);
    assert!(error.payload["error"].as_str().unwrap().contains("cmd_type"));
}

#[tokio::test]
async fn test_command_before_control_connect_is_rejected() {
    let ts = TestServer::start(HashMap::new(), None, None).await;
    let mut client = TestClient::connect(ts.addr).await;

    client
        .send(
            EventFrame::new(Namespace::Control, COMMAND_EVENT, json!({"cmd_type": "ping"}))
                .with_ack(3),
        )
        .await;

    let ack = client.recv().await;
    assert_eq!(ack.event, ACK_EVENT);
    assert_eq!(ack.ack, Some(3));
    assert_eq!(ack.payload["accepted"], json!(false));
    assert_eq!(
        ack.payload["message"],
        json!("Not connected to the control namespace")
    );
}

#[tokio::test]
async fn test_custom_command_handler_answers_through_the_ack() {
    let ts = TestServer::start(HashMap::new(), Some(Arc::new(EchoCommandHandler)), None).await;
    let mut client = TestClient::connect(ts.addr).await;
    client.open(Namespace::Control).await;

    client
        .send(
            EventFrame::new(
                Namespace::Control,
                COMMAND_EVENT,
                json!({"cmd_type": "set_state", "clock": 1.5}),
            )
            .with_ack(4),
        )
        .await;

    let ack = client.recv().await;
    assert_eq!(ack.payload["accepted"], json!(true));
    assert_eq!(ack.payload["message"], json!("echo set_state"));
}

#[tokio::test]
async fn test_data_disconnect_runs_hook_and_keeps_control_alive() {
    let hook = Arc::new(CountingDisconnectHandler {
        calls: AtomicUsize::new(0),
    });
    let ts = TestServer::start(HashMap::new(), None, Some(hook.clone())).await;
    let mut client = TestClient::connect(ts.addr).await;

    client.open(Namespace::Control).await;
    client.open(Namespace::Data).await;

    client
        .send(EventFrame::new(Namespace::Data, DISCONNECT_EVENT, json!({})))
        .await;

    // Frames on one connection are processed in order, so the ack below
    // proves the disconnect above completed.
    client
        .send(
            EventFrame::new(Namespace::Control, COMMAND_EVENT, json!({"cmd_type": "ping"}))
                .with_ack(5),
        )
        .await;
    let ack = client.recv().await;
    assert_eq!(ack.ack, Some(5));
    assert_eq!(ack.payload["accepted"], json!(true));

    assert_eq!(hook.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_registered_channel_callback_receives_messages() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut callbacks = HashMap::new();
    callbacks.insert(
        "image".to_string(),
        CallbackInfo::new(ChannelKind::Json, Arc::new(ForwardingDataHandler { tx })),
    );
    let ts = TestServer::start(callbacks, None, None).await;
    let mut client = TestClient::connect(ts.addr).await;

    let data_sid = client.open(Namespace::Data).await;
    client
        .send(EventFrame::new(
            Namespace::Data,
            "image",
            json!({"frame": "00ff", "timestamp": 42}),
        ))
        .await;

    let (sid, payload) = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
        .await
        .expect("Timed out waiting for the channel callback")
        .unwrap();
    assert_eq!(sid, data_sid);
    assert_eq!(payload, json!({"frame": "00ff", "timestamp": 42}));
}

#[tokio::test]
async fn test_server_push_reaches_the_client() {
    let ts = TestServer::start(HashMap::new(), None, None).await;
    let mut client = TestClient::connect(ts.addr).await;

    let data_sid = client.open(Namespace::Data).await;
    ts.server
        .send_data(
            json!({"detections": [1, 2, 3]}),
            "results",
            ChannelKind::Json,
            data_sid,
        )
        .await
        .unwrap();

    let frame = client.recv().await;
    assert_eq!(frame.namespace, Namespace::Data);
    assert_eq!(frame.event, "results");
    assert_eq!(frame.payload, json!({"detections": [1, 2, 3]}));
}
