//! Connection registry using the actor pattern.
//!
//! The registry is the single serialization point for the table of live
//! peer connections. It receives commands via a tokio mpsc channel and is
//! the canonical source of truth for which ids are active.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐                    ┌─────────────────┐
//! │ Listener     │──┐                 │                 │
//! │ Connector    │──┼─RegistryCommand▶│  RegistryActor  │
//! │ Receiver(s)  │──┤  (mpsc channel) │                 │
//! │ Dispatcher   │──┘                 └────────┬────────┘
//! └──────────────┘                             │
//!                                BTreeMap<ConnectionId, ConnectionEntry>
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All operations in this module follow the panic-free policy:
//! - No `.unwrap()` or `.expect()` in production code
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

use std::sync::Arc;

use tokio::io::BufWriter;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{mpsc, Mutex};

mod actor;
mod commands;
mod handle;

pub use actor::RegistryActor;
pub use commands::{ConnectionLink, Registration, RegistryCommand, RegistryError, RemovalReason};
pub use handle::RegistryHandle;

/// Shared writer for one connection's socket.
///
/// Only the dispatcher writes; the lock serialises overlapping sends.
pub type PeerWriter = Arc<Mutex<BufWriter<OwnedWriteHalf>>>;

/// Command channel buffer size
const COMMAND_BUFFER: usize = 100;

/// Spawn the registry actor and return a handle for interaction.
///
/// The actor runs until every handle has been dropped.
///
/// # Example
///
/// ```no_run
/// use lanchat_node::registry::spawn_registry;
///
/// #[tokio::main]
/// async fn main() {
///     let handle = spawn_registry();
///     let connections = handle.list().await;
///     assert!(connections.is_empty());
/// }
/// ```
pub fn spawn_registry() -> RegistryHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);

    let actor = RegistryActor::new(cmd_rx);
    tokio::spawn(actor.run());

    RegistryHandle::new(cmd_tx)
}
