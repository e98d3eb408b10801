//! Registry actor commands and errors.
//!
//! This module defines the message types for communicating with the `RegistryActor`:
//! - `RegistryCommand`: Commands sent to the actor
//! - `RegistryError`: Errors that can occur during registry operations
//! - `RemovalReason`: Why a connection left the table
//!
//! All types are designed for async message passing and follow the panic-free policy.

use std::fmt;

use lanchat_core::{ConnectionId, ConnectionView, Direction, PeerAddr};
use thiserror::Error;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use super::PeerWriter;

// ============================================================================
// Registry Commands
// ============================================================================

/// Commands sent to the registry actor.
///
/// Each command uses a oneshot channel for the response, enabling
/// request-response patterns in async code without blocking.
#[derive(Debug)]
pub enum RegistryCommand {
    /// Register a freshly accepted or dialed socket.
    ///
    /// # Errors
    /// - `RegistryError::DuplicateConnection` if an outbound link to the
    ///   same peer is already active
    /// - `RegistryError::ShuttingDown` once the table has been drained
    Register {
        /// Write half of the socket; owned by the registry from here on
        writer: OwnedWriteHalf,
        /// Remote identity observed on the socket
        peer: PeerAddr,
        /// Who opened the link
        direction: Direction,
        /// Channel to send the result
        respond_to: oneshot::Sender<Result<Registration, RegistryError>>,
    },

    /// Look up one active connection.
    Lookup {
        id: ConnectionId,
        respond_to: oneshot::Sender<Option<ConnectionLink>>,
    },

    /// Find the active outbound connection to `peer`, if any.
    FindOutbound {
        peer: PeerAddr,
        respond_to: oneshot::Sender<Option<ConnectionId>>,
    },

    /// Snapshot of every active connection, ascending by id.
    List {
        respond_to: oneshot::Sender<Vec<ConnectionView>>,
    },

    /// Remove and close one connection.
    ///
    /// Idempotent: the reply is `true` only for the call that actually
    /// removed the entry.
    Remove {
        id: ConnectionId,
        reason: RemovalReason,
        respond_to: oneshot::Sender<bool>,
    },

    /// Remove and close every connection (shutdown).
    ///
    /// Later `Register` commands are refused.
    Drain {
        respond_to: oneshot::Sender<Vec<ConnectionView>>,
    },
}

/// Returned to whoever registered a socket.
///
/// The receiver for the connection selects on `closed` so that removal
/// from the registry unblocks its pending read.
#[derive(Debug, Clone)]
pub struct Registration {
    pub id: ConnectionId,
    pub closed: CancellationToken,
}

/// A looked-up connection: its snapshot plus a handle for writing.
#[derive(Debug, Clone)]
pub struct ConnectionLink {
    pub view: ConnectionView,
    pub writer: PeerWriter,
}

// ============================================================================
// Registry Errors
// ============================================================================

/// Errors that can occur during registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// An outbound link to this peer is already active.
    #[error("already connected to {peer} (connection {existing})")]
    DuplicateConnection {
        peer: PeerAddr,
        existing: ConnectionId,
    },

    /// The registry was drained for shutdown and accepts no new links.
    #[error("shutting down, not accepting connections")]
    ShuttingDown,

    /// The response channel was closed before receiving a response.
    ///
    /// This typically indicates the actor was shut down.
    #[error("response channel closed")]
    ChannelClosed,
}

// ============================================================================
// Removal Reasons
// ============================================================================

/// Why a connection was removed from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// Operator issued `terminate <id>`.
    Terminated,

    /// Peer closed its end of the stream.
    PeerClosed,

    /// Reading from the socket failed.
    ReadFailed,

    /// Peer sent an oversized line.
    ProtocolViolation,

    /// Writing to the socket failed during `send`.
    WriteFailed,

    /// Process is exiting.
    Shutdown,
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminated => write!(f, "terminated locally"),
            Self::PeerClosed => write!(f, "closed by peer"),
            Self::ReadFailed => write!(f, "read failed"),
            Self::ProtocolViolation => write!(f, "protocol violation"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::Shutdown => write!(f, "shutting down"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_registry_error_display() {
        let err = RegistryError::DuplicateConnection {
            peer: PeerAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), 8000),
            existing: ConnectionId::new(4),
        };
        assert_eq!(
            err.to_string(),
            "already connected to 10.0.0.2:8000 (connection 4)"
        );

        let err = RegistryError::ChannelClosed;
        assert_eq!(err.to_string(), "response channel closed");

        assert_eq!(
            RegistryError::ShuttingDown.to_string(),
            "shutting down, not accepting connections"
        );
    }

    #[test]
    fn test_removal_reason_display() {
        assert_eq!(RemovalReason::Terminated.to_string(), "terminated locally");
        assert_eq!(RemovalReason::PeerClosed.to_string(), "closed by peer");
        assert_eq!(RemovalReason::WriteFailed.to_string(), "write failed");
        assert_eq!(RemovalReason::Shutdown.to_string(), "shutting down");
    }
}
