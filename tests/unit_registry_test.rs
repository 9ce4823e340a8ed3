use duplexd::connection::{ConnectionQueues, ConnectionRegistry};
use duplexd::core::identity::{ConnectionId, IdentityMapper, SessionId};
use duplexd::core::namespace::COMMAND_ERROR_EVENT;
use duplexd::core::protocol::EventFrame;
use duplexd::core::transport::Transport;
use duplexd::core::{Namespace, ServerError};
use serde_json::json;
use std::sync::Arc;

fn registry(back_pressure_size: usize) -> (Arc<IdentityMapper>, ConnectionRegistry) {
    let identity = Arc::new(IdentityMapper::new());
    let registry = ConnectionRegistry::new(identity.clone(), back_pressure_size);
    (identity, registry)
}

fn frame() -> EventFrame {
    EventFrame::new(Namespace::Data, "results", json!({}))
}

#[tokio::test]
async fn test_emit_reaches_the_connection_queue() {
    let (identity, registry) = registry(5);
    let conn = ConnectionId(1);
    let sid = SessionId::new();
    let mut queues = registry.register(conn);
    identity.bind(Namespace::Control, conn, sid);

    registry
        .emit(COMMAND_ERROR_EVENT, Namespace::Control, sid, json!({"error": "nope"}))
        .await
        .unwrap();

    let frame = queues.frames.recv().await.unwrap();
    assert_eq!(frame.namespace, Namespace::Control);
    assert_eq!(frame.event, COMMAND_ERROR_EVENT);
    assert_eq!(frame.payload, json!({"error": "nope"}));
}

#[tokio::test]
async fn test_emit_to_unknown_session_is_a_transport_error() {
    let (_identity, registry) = registry(5);
    let err = registry
        .emit("anything", Namespace::Data, SessionId::new(), json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ServerError::NotFound { .. }));
}

#[tokio::test]
async fn test_emit_after_unregister_is_a_transport_error() {
    let (identity, registry) = registry(5);
    let conn = ConnectionId(2);
    let sid = SessionId::new();
    let _queues = registry.register(conn);
    identity.bind(Namespace::Data, conn, sid);

    registry.unregister(conn);

    let err = registry
        .emit("results", Namespace::Data, sid, json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ServerError::Transport(_)));
}

#[tokio::test]
async fn test_full_queue_rejects_instead_of_blocking() {
    let (_identity, registry) = registry(2);
    let conn = ConnectionId(3);
    let _queues = registry.register(conn);

    registry.push(conn, frame()).unwrap();
    registry.push(conn, frame()).unwrap();

    let err = registry.push(conn, frame()).unwrap_err();
    assert!(matches!(err, ServerError::Transport(_)));
}

#[tokio::test]
async fn test_disconnect_enqueues_teardown_instruction() {
    let (identity, registry) = registry(5);
    let conn = ConnectionId(4);
    let sid = SessionId::new();
    let mut queues = registry.register(conn);
    identity.bind(Namespace::Control, conn, sid);

    registry.disconnect(Namespace::Control, sid).await.unwrap();

    assert_eq!(queues.disconnects.recv().await, Some(Namespace::Control));
}

#[tokio::test]
async fn test_disconnect_bypasses_a_full_frame_queue() {
    let (identity, registry) = registry(1);
    let conn = ConnectionId(5);
    let sid = SessionId::new();
    let mut queues: ConnectionQueues = registry.register(conn);
    identity.bind(Namespace::Control, conn, sid);

    // Saturate the frame queue; further frames are rejected.
    registry.push(conn, frame()).unwrap();
    assert!(registry.push(conn, frame()).is_err());

    // The teardown instruction still gets through.
    registry.disconnect(Namespace::Control, sid).await.unwrap();
    assert_eq!(queues.disconnects.recv().await, Some(Namespace::Control));
}

#[tokio::test]
async fn test_disconnect_after_unregister_is_a_transport_error() {
    let (identity, registry) = registry(5);
    let conn = ConnectionId(6);
    let sid = SessionId::new();
    let _queues = registry.register(conn);
    identity.bind(Namespace::Control, conn, sid);

    registry.unregister(conn);

    let err = registry
        .disconnect(Namespace::Control, sid)
        .await
        .unwrap_err();
    assert!(matches!(err, ServerError::Transport(_)));
}

#[tokio::test]
async fn test_registry_tracks_live_connections() {
    let (_identity, registry) = registry(5);
    assert!(registry.is_empty());
    let _queues = registry.register(ConnectionId(7));
    assert_eq!(registry.len(), 1);
    registry.unregister(ConnectionId(7));
    assert!(registry.is_empty());
}
