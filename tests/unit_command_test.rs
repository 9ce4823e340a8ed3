use duplexd::core::{CommandOutcome, ControlCommand, ServerError};
use serde_json::json;

#[tokio::test]
async fn test_parse_minimal_command() {
    let command = ControlCommand::parse(json!({"cmd_type": "ping"})).unwrap();
    assert_eq!(command.cmd_type, "ping");
    assert_eq!(command.clock, None);
    assert!(command.data.is_empty());
}

#[tokio::test]
async fn test_parse_full_command() {
    let raw = json!({
        "cmd_type": "set_state",
        "clock": 12.5,
        "data": {"robot_id": "r2", "speed": 3},
    });
    let command = ControlCommand::parse(raw).unwrap();
    assert_eq!(command.cmd_type, "set_state");
    assert_eq!(command.clock, Some(12.5));
    assert_eq!(command.data["robot_id"], json!("r2"));
    assert_eq!(command.data["speed"], json!(3));
}

#[tokio::test]
async fn test_missing_cmd_type_is_rejected() {
    let err = ControlCommand::parse(json!({"data": {}})).unwrap_err();
    match err {
        ServerError::Validation(msg) => assert!(msg.contains("cmd_type")),
        other => panic!("Expected Validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_string_cmd_type_is_rejected() {
    let result = ControlCommand::parse(json!({"cmd_type": 5}));
    assert!(matches!(result, Err(ServerError::Validation(_))));
}

#[tokio::test]
async fn test_unknown_field_is_rejected() {
    let result = ControlCommand::parse(json!({"cmd_type": "ping", "bogus": true}));
    assert!(matches!(result, Err(ServerError::Validation(_))));
}

#[tokio::test]
async fn test_non_object_payload_is_rejected() {
    let result = ControlCommand::parse(json!("just a string"));
    assert!(matches!(result, Err(ServerError::Validation(_))));
}

#[tokio::test]
async fn test_outcome_constructors() {
    let ok = CommandOutcome::accepted("done");
    assert!(ok.accepted);
    assert_eq!(ok.message, "done");

    let nope = CommandOutcome::rejected("no");
    assert!(!nope.accepted);
    assert_eq!(nope.message, "no");
}
