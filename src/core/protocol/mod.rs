// src/core/protocol/mod.rs

//! The wire protocol: multiplexed event frames and their codec.

mod frame;

pub use frame::{EventFrame, EventFrameCodec};
