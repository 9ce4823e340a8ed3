// src/core/namespace.rs

//! Defines the two logical namespaces multiplexed over one connection, their
//! wire names, and the reserved event names of the control protocol.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Wire name of the control namespace.
pub const CONTROL_NAMESPACE: &str = "/control";
/// Wire name of the data namespace.
pub const DATA_NAMESPACE: &str = "/data";

/// Event name for inbound control commands on the control namespace.
pub const COMMAND_EVENT: &str = "command";
/// Event name for structured command-error notifications pushed to a client.
pub const COMMAND_ERROR_EVENT: &str = "control_cmd_error";
/// Event name for plain-text messages (welcome acknowledgments).
pub const MESSAGE_EVENT: &str = "message";
/// Event name for transport-level acknowledgments of control commands.
pub const ACK_EVENT: &str = "ack";
/// Event name with which a client joins a namespace.
pub const CONNECT_EVENT: &str = "connect";
/// Event name with which a client leaves a namespace.
pub const DISCONNECT_EVENT: &str = "disconnect";

/// A logically distinct sub-channel multiplexed over one physical connection.
///
/// A session id is meaningful only within its namespace; the same value in
/// the other namespace never denotes the same session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum Namespace {
    /// Command/response traffic.
    #[serde(rename = "/control")]
    #[strum(serialize = "/control")]
    Control,
    /// High-volume payloads (frames, structured results).
    #[serde(rename = "/data")]
    #[strum(serialize = "/data")]
    Data,
}

impl Namespace {
    /// The namespace's wire name, as carried in event frames.
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Control => CONTROL_NAMESPACE,
            Namespace::Data => DATA_NAMESPACE,
        }
    }
}
