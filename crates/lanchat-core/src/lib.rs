//! lanchat core - shared types for peer connections
//!
//! This crate provides the domain types shared between the wire
//! protocol crate (`lanchat-protocol`) and the node runtime
//! (`lanchat-node`).
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod connection;
pub mod error;
pub mod peer;

// Re-exports for convenience
pub use connection::{ConnectionId, ConnectionState, ConnectionView, Direction};
pub use error::{DomainError, DomainResult};
pub use peer::PeerAddr;
