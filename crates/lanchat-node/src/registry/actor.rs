//! Registry actor - owns all connection state and processes commands.
//!
//! The RegistryActor is the single owner of the connection table.
//! It receives commands via an mpsc channel and answers on oneshot channels.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Channel send failures are ignored, never panicked on

use std::collections::BTreeMap;
use std::sync::Arc;

use lanchat_core::{ConnectionId, ConnectionState, ConnectionView, Direction, PeerAddr};
use tokio::io::BufWriter;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::commands::{ConnectionLink, Registration, RegistryCommand, RegistryError, RemovalReason};
use super::PeerWriter;

/// One live entry of the table.
struct ConnectionEntry {
    view: ConnectionView,
    writer: PeerWriter,
    /// Fired on removal; the connection's receiver selects on it.
    closed: CancellationToken,
}

impl ConnectionEntry {
    fn link(&self) -> ConnectionLink {
        ConnectionLink {
            view: self.view.clone(),
            writer: Arc::clone(&self.writer),
        }
    }

    /// Starts the `Active -> Closing` transition.
    ///
    /// Dropping the entry drops the registry's reference to the write half;
    /// once any in-flight `send` releases its clone, tokio shuts down the
    /// write direction and the peer sees EOF.
    fn close(mut self) -> ConnectionView {
        self.closed.cancel();
        self.view.state = ConnectionState::Closing;
        self.view
    }
}

/// The registry actor - owns all connection state.
///
/// Implements the actor pattern: receives commands via mpsc channel and
/// processes them sequentially. Every mutation of the table is therefore
/// totally ordered.
pub struct RegistryActor {
    /// Command receiver
    receiver: mpsc::Receiver<RegistryCommand>,

    /// Active connections. A `BTreeMap` so that `list` is ascending by id.
    connections: BTreeMap<ConnectionId, ConnectionEntry>,

    /// Next id to hand out. Only ever grows.
    next_id: ConnectionId,

    /// Cleared by `Drain`; registrations after that are refused.
    accepting: bool,
}

impl RegistryActor {
    /// Creates a new registry actor.
    pub fn new(receiver: mpsc::Receiver<RegistryCommand>) -> Self {
        Self {
            receiver,
            connections: BTreeMap::new(),
            next_id: ConnectionId::FIRST,
            accepting: true,
        }
    }

    /// Runs the actor event loop.
    ///
    /// Processes commands until the channel closes (all handles dropped).
    pub async fn run(mut self) {
        debug!("Registry actor starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        debug!(
            remaining = self.connections.len(),
            "Registry actor stopped"
        );
    }

    /// Dispatches a command to the appropriate handler.
    fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Register {
                writer,
                peer,
                direction,
                respond_to,
            } => {
                let result = self.handle_register(writer, peer, direction);
                // Ignore send error - caller may have dropped the receiver
                let _ = respond_to.send(result);
            }
            RegistryCommand::Lookup { id, respond_to } => {
                let _ = respond_to.send(self.connections.get(&id).map(ConnectionEntry::link));
            }
            RegistryCommand::FindOutbound { peer, respond_to } => {
                let _ = respond_to.send(self.find_outbound(&peer));
            }
            RegistryCommand::List { respond_to } => {
                let views = self.connections.values().map(|e| e.view.clone()).collect();
                let _ = respond_to.send(views);
            }
            RegistryCommand::Remove {
                id,
                reason,
                respond_to,
            } => {
                let _ = respond_to.send(self.handle_remove(id, reason));
            }
            RegistryCommand::Drain { respond_to } => {
                let _ = respond_to.send(self.handle_drain());
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    fn handle_register(
        &mut self,
        writer: OwnedWriteHalf,
        peer: PeerAddr,
        direction: Direction,
    ) -> Result<Registration, RegistryError> {
        // A socket accepted or dialed while shutdown was draining the
        // table would otherwise outlive the shutdown.
        if !self.accepting {
            debug!(peer = %peer, direction = %direction, "Refusing registration after drain");
            return Err(RegistryError::ShuttingDown);
        }

        // The connector checks this before dialing; re-check here so two
        // racing dials to the same peer cannot both be admitted.
        if direction == Direction::Outbound {
            if let Some(existing) = self.find_outbound(&peer) {
                debug!(peer = %peer, existing = %existing, "Rejecting duplicate outbound connection");
                return Err(RegistryError::DuplicateConnection { peer, existing });
            }
        }

        let id = self.next_id;
        self.next_id = id.next();

        let closed = CancellationToken::new();
        self.connections.insert(
            id,
            ConnectionEntry {
                view: ConnectionView::new(id, peer, direction),
                writer: Arc::new(Mutex::new(BufWriter::new(writer))),
                closed: closed.clone(),
            },
        );

        info!(
            id = %id,
            peer = %peer,
            direction = %direction,
            total = self.connections.len(),
            "Connection registered"
        );

        Ok(Registration { id, closed })
    }

    fn find_outbound(&self, peer: &PeerAddr) -> Option<ConnectionId> {
        self.connections
            .values()
            .find(|e| e.view.direction == Direction::Outbound && e.view.peer == *peer)
            .map(|e| e.view.id)
    }

    fn handle_remove(&mut self, id: ConnectionId, reason: RemovalReason) -> bool {
        let Some(entry) = self.connections.remove(&id) else {
            debug!(id = %id, reason = %reason, "Remove of absent connection ignored");
            return false;
        };

        let view = entry.close();
        info!(
            id = %id,
            peer = %view.peer,
            reason = %reason,
            remaining = self.connections.len(),
            "Connection removed"
        );
        true
    }

    fn handle_drain(&mut self) -> Vec<ConnectionView> {
        self.accepting = false;

        let drained = std::mem::take(&mut self.connections);
        let views: Vec<ConnectionView> = drained.into_values().map(ConnectionEntry::close).collect();

        for view in &views {
            debug!(id = %view.id, reason = %RemovalReason::Shutdown, "Connection removed");
        }
        info!(closed = views.len(), "Registry drained");
        views
    }
}
