//! Shutdown coordinator for `exit`, stdin EOF and termination signals.

use lanchat_core::ConnectionView;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::node::Node;

/// What a shutdown pass did.
#[derive(Debug)]
pub struct ShutdownReport {
    /// Connections that were still active and got closed.
    pub closed: Vec<ConnectionView>,
    /// Whether every receiver exited within the grace period.
    pub receivers_finished: bool,
}

/// Closes every live connection and stops the listener.
///
/// Draining the registry fires each connection's close signal and drops
/// its write half, so every receiver unblocks and exits and every peer
/// observes EOF. The wait for receivers is bounded, so a stuck task can
/// never hold up process exit. Safe to call more than once.
pub async fn shutdown(node: &Node) -> ShutdownReport {
    node.cancel_token().cancel();

    let closed = node.registry().drain().await;
    for view in &closed {
        info!(id = %view.id, peer = %view.peer, "Closed connection on shutdown");
    }

    let receivers = node.receivers();
    receivers.close();
    let grace = node.config().shutdown_grace;
    let receivers_finished = timeout(grace, receivers.wait()).await.is_ok();
    if !receivers_finished {
        warn!(
            remaining = receivers.len(),
            "Receivers still running after shutdown grace period"
        );
    }

    node.display()
        .reply(format!("Closed {} connection(s). Goodbye.", closed.len()));

    ShutdownReport {
        closed,
        receivers_finished,
    }
}
