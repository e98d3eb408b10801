//! TCP listener for inbound peer connections.
//!
//! The listener:
//! - Binds the configured port once at startup
//! - Registers every accepted socket as an inbound connection
//! - Spawns a [`Receiver`] for each one
//! - Stops when the node's cancellation token fires
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │    Listener     │
//! │                 │
//! │   TcpListener   │
//! └───────┬─────────┘
//!         │ accept()
//!         ▼
//! ┌─────────────────┐  register   ┌─────────────────┐
//! │ OwnedWriteHalf  │────────────▶│  RegistryHandle │
//! └─────────────────┘             └─────────────────┘
//! ┌─────────────────┐
//! │ OwnedReadHalf   │────▶ Receiver (one task per connection)
//! └─────────────────┘
//! ```

mod receiver;

pub use receiver::{read_frame, Receiver, ReceiverError};
pub(crate) use receiver::spawn_receiver;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use lanchat_core::{Direction, PeerAddr};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::node::Node;
use crate::registry::RegistryError;

/// Pause after a failed accept so a persistent error (e.g. out of file
/// descriptors) does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Binds `0.0.0.0:<port>`.
pub(crate) async fn bind_listener(port: u16) -> Result<TcpListener, ServerError> {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::BindFailed {
            port,
            error: e.to_string(),
        })
}

/// Accept loop for inbound peers.
pub struct Listener {
    listener: TcpListener,
    node: Node,
}

impl Listener {
    pub(crate) fn new(listener: TcpListener, node: Node) -> Self {
        Self { listener, node }
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop until the node shuts down.
    ///
    /// Accept errors are logged and the loop continues.
    pub async fn run(self) {
        info!(
            port = self.node.identity().listen_port,
            "Listening for peers"
        );

        loop {
            tokio::select! {
                _ = self.node.cancel_token().cancelled() => {
                    info!("Listener shutdown requested");
                    break;
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => self.admit(stream, PeerAddr::from(addr)).await,
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                            sleep(ACCEPT_BACKOFF).await;
                        }
                    }
                }
            }
        }

        debug!("Listener stopped");
    }

    /// Registers an accepted socket and starts its receiver.
    ///
    /// A socket accepted while shutdown is draining the registry is
    /// refused by the registry and dropped here, so the peer sees EOF.
    async fn admit(&self, stream: TcpStream, peer: PeerAddr) {
        if self.node.cancel_token().is_cancelled() {
            debug!(peer = %peer, "Dropping inbound connection during shutdown");
            return;
        }

        let (reader, writer) = stream.into_split();

        match self
            .node
            .registry()
            .register(writer, peer, Direction::Inbound)
            .await
        {
            Ok(registration) => {
                self.node.display().notice(format!(
                    "New connection from {peer} (id {})",
                    registration.id
                ));
                spawn_receiver(&self.node, registration, peer, reader);
            }
            Err(RegistryError::ShuttingDown) => {
                debug!(peer = %peer, "Dropping inbound connection during shutdown");
            }
            Err(e) => {
                warn!(peer = %peer, error = %e, "Dropping inbound connection");
            }
        }
    }
}

/// Errors that can occur in listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind port {port}: {error}")]
    BindFailed { port: u16, error: String },
}
