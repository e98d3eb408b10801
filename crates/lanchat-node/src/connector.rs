//! Outbound dialing.
//!
//! `connect` runs on the dispatcher's task: the operator's command loop
//! waits for the dial to resolve or time out. The registry it updates is
//! the same one the listener and receivers use concurrently.

use lanchat_core::{ConnectionId, Direction, PeerAddr};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::node::Node;
use crate::registry::RegistryError;
use crate::server::spawn_receiver;

/// Errors returned by [`Connector::connect`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("cannot connect to yourself ({peer})")]
    SelfConnect { peer: PeerAddr },

    #[error("already connected to {peer} (connection {existing})")]
    DuplicateConnection {
        peer: PeerAddr,
        existing: ConnectionId,
    },

    #[error("failed to connect to {peer}: {reason}")]
    ConnectFailed { peer: PeerAddr, reason: String },

    #[error("shutting down, not opening new connections")]
    ShuttingDown,

    #[error("connection registry unavailable")]
    RegistryUnavailable,
}

impl From<RegistryError> for ConnectError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateConnection { peer, existing } => {
                Self::DuplicateConnection { peer, existing }
            }
            RegistryError::ShuttingDown => Self::ShuttingDown,
            RegistryError::ChannelClosed => Self::RegistryUnavailable,
        }
    }
}

/// Dials peers and hands the sockets to the registry.
pub struct Connector {
    node: Node,
}

impl Connector {
    pub fn new(node: Node) -> Self {
        Self { node }
    }

    /// Opens an outbound connection to `peer` and starts its receiver.
    ///
    /// Validation happens in a fixed order: self-connect, then duplicate,
    /// then the dial itself (bounded by `NodeConfig::connect_timeout`).
    /// A rejected request never touches the registry.
    pub async fn connect(&self, peer: PeerAddr) -> Result<ConnectionId, ConnectError> {
        if self.node.identity().is_self(&peer) {
            debug!(peer = %peer, "Rejecting self-connect");
            return Err(ConnectError::SelfConnect { peer });
        }

        if let Some(existing) = self.node.registry().find_outbound(peer).await {
            return Err(ConnectError::DuplicateConnection { peer, existing });
        }

        let dial_timeout = self.node.config().connect_timeout;
        debug!(peer = %peer, timeout = ?dial_timeout, "Dialing peer");

        let stream = match timeout(dial_timeout, TcpStream::connect(peer.socket_addr())).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(ConnectError::ConnectFailed {
                    peer,
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(ConnectError::ConnectFailed {
                    peer,
                    reason: format!("timed out after {}s", dial_timeout.as_secs_f32()),
                })
            }
        };

        let (reader, writer) = stream.into_split();
        let registration = self
            .node
            .registry()
            .register(writer, peer, Direction::Outbound)
            .await?;
        let id = registration.id;

        info!(id = %id, peer = %peer, "Outbound connection established");
        spawn_receiver(&self.node, registration, peer, reader);

        Ok(id)
    }
}
