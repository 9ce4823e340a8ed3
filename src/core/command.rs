// src/core/command.rs

//! The control command schema and its validating constructor.

use crate::core::errors::ServerError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A structured, validated request received on the control namespace.
///
/// A `ControlCommand` value exists only if the raw payload validated against
/// this shape; partial construction never happens. `cmd_type` is the
/// mandatory discriminator; everything under `data` is opaque to the server
/// and semantically validated only by the user-supplied command handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlCommand {
    /// The command discriminator.
    pub cmd_type: String,
    /// Optional client clock reference carried alongside the command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock: Option<f64>,
    /// Command-specific fields, passed through to the command handler.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
}

impl ControlCommand {
    /// Attempts to construct a command from a raw control payload.
    ///
    /// Unknown top-level fields and a missing or non-string `cmd_type` are
    /// structural mismatches and yield a descriptive [`ServerError::Validation`].
    pub fn parse(raw: Value) -> Result<Self, ServerError> {
        serde_json::from_value(raw)
            .map_err(|e| ServerError::Validation(format!("Could not parse control command: {e}")))
    }
}

/// The uniform `(accepted, message)` result of handling one control command.
///
/// `accepted == false` means parsing or processing failed; the client is
/// responsible for resubmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub accepted: bool,
    pub message: String,
}

impl CommandOutcome {
    pub fn accepted(message: impl Into<String>) -> Self {
        Self {
            accepted: true,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            message: message.into(),
        }
    }
}
