//! # Wire Module
//!
//! Framing, opcodes and transport for the VM hosting service protocol.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod codec;
pub mod opcode;
pub mod transport;

pub use codec::{decode, encode};
pub use transport::{WsMessage, WsReader, WsWriter, ABNORMAL_CLOSE, NORMAL_CLOSE};
