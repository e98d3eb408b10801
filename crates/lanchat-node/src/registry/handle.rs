//! Client interface for interacting with the RegistryActor.
//!
//! The `RegistryHandle` provides a cheap-to-clone interface for sending commands
//! to the registry actor.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Channel errors are mapped to `RegistryError::ChannelClosed`

use lanchat_core::{ConnectionId, ConnectionView, Direction, PeerAddr};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{mpsc, oneshot};

use super::commands::{ConnectionLink, Registration, RegistryCommand, RegistryError, RemovalReason};

// ============================================================================
// Registry Handle
// ============================================================================

/// Handle for interacting with the registry actor.
///
/// This is a cheap-to-clone handle that can be shared across tasks.
/// All methods are async and communicate with the actor via channels.
#[derive(Clone)]
pub struct RegistryHandle {
    /// Command sender to the actor
    sender: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    /// Create a new registry handle.
    pub fn new(sender: mpsc::Sender<RegistryCommand>) -> Self {
        Self { sender }
    }

    /// Hand a socket's write half to the registry and get its id.
    ///
    /// # Errors
    ///
    /// - `RegistryError::DuplicateConnection` if `direction` is outbound and
    ///   a link to `peer` is already active (the socket is dropped)
    /// - `RegistryError::ShuttingDown` if the registry was already drained
    ///   (the socket is dropped)
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn register(
        &self,
        writer: OwnedWriteHalf,
        peer: PeerAddr,
        direction: Direction,
    ) -> Result<Registration, RegistryError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::Register {
                writer,
                peer,
                direction,
                respond_to: tx,
            })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        rx.await.map_err(|_| RegistryError::ChannelClosed)?
    }

    /// Get one active connection by id.
    ///
    /// Returns `None` if the id is absent or if communication with the
    /// actor fails.
    pub async fn lookup(&self, id: ConnectionId) -> Option<ConnectionLink> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::Lookup { id, respond_to: tx })
            .await
            .ok()?;

        rx.await.ok()?
    }

    /// Find the active outbound connection to `peer`.
    pub async fn find_outbound(&self, peer: PeerAddr) -> Option<ConnectionId> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::FindOutbound {
                peer,
                respond_to: tx,
            })
            .await
            .ok()?;

        rx.await.ok()?
    }

    /// Get all active connections, ascending by id.
    ///
    /// Returns an empty vector if the actor is unreachable.
    pub async fn list(&self) -> Vec<ConnectionView> {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(RegistryCommand::List { respond_to: tx })
            .await
            .is_err()
        {
            return Vec::new();
        }

        rx.await.unwrap_or_default()
    }

    /// Remove a connection and fire its close signal.
    ///
    /// Idempotent. Returns `true` only if this call removed the entry;
    /// a concurrent remover that lost the race gets `false`.
    pub async fn remove(&self, id: ConnectionId, reason: RemovalReason) -> bool {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(RegistryCommand::Remove {
                id,
                reason,
                respond_to: tx,
            })
            .await
            .is_err()
        {
            return false;
        }

        rx.await.unwrap_or(false)
    }

    /// Remove and close every connection.
    ///
    /// Returns the views of the connections that were closed.
    pub async fn drain(&self) -> Vec<ConnectionView> {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(RegistryCommand::Drain { respond_to: tx })
            .await
            .is_err()
        {
            return Vec::new();
        }

        rx.await.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::net::{TcpListener, TcpStream};

    /// A handle whose actor is already gone.
    fn orphaned_handle() -> RegistryHandle {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        RegistryHandle::new(tx)
    }

    #[tokio::test]
    async fn test_register_without_actor_is_channel_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (_read, write) = client.into_split();
        let peer = PeerAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9001);

        let err = orphaned_handle()
            .register(write, peer, Direction::Outbound)
            .await
            .unwrap_err();
        assert_eq!(err, RegistryError::ChannelClosed);
    }

    #[tokio::test]
    async fn test_queries_without_actor_return_empty() {
        let handle = orphaned_handle();
        let id = ConnectionId::new(1);
        let peer = PeerAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9001);

        assert!(handle.lookup(id).await.is_none());
        assert!(handle.find_outbound(peer).await.is_none());
        assert!(handle.list().await.is_empty());
        assert!(!handle.remove(id, RemovalReason::Terminated).await);
        assert!(handle.drain().await.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_reply_is_channel_closed() {
        // Actor that takes the command but never answers
        let (tx, mut rx) = mpsc::channel(1);
        tokio::spawn(async move {
            while let Some(cmd) = rx.recv().await {
                drop(cmd);
            }
        });
        let handle = RegistryHandle::new(tx);

        assert!(handle.list().await.is_empty());
        assert!(!handle.remove(ConnectionId::new(1), RemovalReason::Terminated).await);
    }
}
