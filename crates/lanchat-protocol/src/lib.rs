//! lanchat protocol - wire framing and operator command grammar
//!
//! Peers exchange plain newline-terminated UTF-8 text over a raw TCP
//! stream: no handshake, no length prefix, no version negotiation.
//! Operators drive the node with one command per line on stdin.

pub mod command;
pub mod frame;

pub use command::{Command, CommandError, HELP_TEXT};
pub use frame::{decode_line, encode_line, ProtocolError, MAX_LINE_BYTES, MAX_MESSAGE_CHARS};
