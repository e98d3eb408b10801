//! Operator command loop.
//!
//! Reads one command per line, runs it against the registry, connector
//! and sockets, and renders every outcome (success or error) as output on
//! the display. Errors never leave this boundary: the loop only ends on
//! `exit` or end of input.

use lanchat_core::{ConnectionId, ConnectionView};
use lanchat_protocol::{encode_line, Command, CommandError, ProtocolError, HELP_TEXT};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::connector::{ConnectError, Connector};
use crate::node::Node;
use crate::registry::RemovalReason;
use crate::shutdown::shutdown;

/// Whether the command loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Errors surfaced to the operator as a single line.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("no such connection: {id}")]
    ConnectionNotFound { id: ConnectionId },

    #[error(transparent)]
    Message(#[from] ProtocolError),

    #[error("failed to send to connection {id}: {reason} (connection removed)")]
    WriteFailed { id: ConnectionId, reason: String },
}

/// Runs operator commands for one node.
pub struct Dispatcher {
    node: Node,
    connector: Connector,
}

impl Dispatcher {
    pub fn new(node: Node) -> Self {
        let connector = node.connector();
        Self { node, connector }
    }

    /// Reads commands from `input` until `exit` or end of input.
    ///
    /// End of input (or an unreadable input) shuts the node down exactly
    /// like `exit`.
    pub async fn run<R>(&self, input: R)
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        self.node.display().prompt();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if self.handle_line(&line).await == Flow::Exit {
                        return;
                    }
                    self.node.display().prompt();
                }
                Ok(None) => {
                    info!("Input closed, shutting down");
                    shutdown(&self.node).await;
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read input, shutting down");
                    shutdown(&self.node).await;
                    return;
                }
            }
        }
    }

    /// Parses and runs one input line, printing the outcome.
    pub async fn handle_line(&self, line: &str) -> Flow {
        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Flow::Continue,
            Err(e) => {
                self.node.display().reply(e.to_string());
                return Flow::Continue;
            }
        };

        debug!(command = ?command, "Dispatching command");
        match self.execute(command).await {
            Ok(flow) => flow,
            Err(e) => {
                self.node.display().reply(format!("Error: {e}"));
                Flow::Continue
            }
        }
    }

    /// Runs one parsed command.
    pub async fn execute(&self, command: Command) -> Result<Flow, DispatchError> {
        let display = self.node.display();

        match command {
            Command::Help => display.reply(HELP_TEXT),

            Command::MyIp => display.reply(self.node.identity().lan_ip.to_string()),

            Command::MyPort => display.reply(self.node.identity().listen_port.to_string()),

            Command::Connect { peer } => {
                let id = self.connector.connect(peer).await?;
                display.reply(format!("Connected to {peer} (id {id})"));
            }

            Command::List => {
                let connections = self.node.registry().list().await;
                display.reply(render_list(&connections));
            }

            Command::Terminate { id } => {
                if !self
                    .node
                    .registry()
                    .remove(id, RemovalReason::Terminated)
                    .await
                {
                    return Err(DispatchError::ConnectionNotFound { id });
                }
                display.reply(format!("Connection {id} terminated"));
            }

            Command::Send { id, message } => {
                self.send(id, &message).await?;
                display.reply(format!("Message sent to {id}"));
            }

            Command::Exit => {
                shutdown(&self.node).await;
                return Ok(Flow::Exit);
            }
        }

        Ok(Flow::Continue)
    }

    /// Writes one framed message to a live connection.
    ///
    /// A failed or stalled write is handled like a receiver-detected
    /// disconnect: the connection is removed.
    async fn send(&self, id: ConnectionId, message: &str) -> Result<(), DispatchError> {
        let registry = self.node.registry();
        let link = registry
            .lookup(id)
            .await
            .ok_or(DispatchError::ConnectionNotFound { id })?;
        let frame = encode_line(message)?;

        let write = async {
            let mut writer = link.writer.lock().await;
            writer.write_all(&frame).await?;
            writer.flush().await
        };

        let reason = match timeout(self.node.config().write_timeout, write).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => e.to_string(),
            Err(_) => "write timed out".to_string(),
        };

        warn!(id = %id, peer = %link.view.peer, reason = %reason, "Send failed");
        registry.remove(id, RemovalReason::WriteFailed).await;
        Err(DispatchError::WriteFailed { id, reason })
    }
}

/// Formats the `list` table.
fn render_list(connections: &[ConnectionView]) -> String {
    if connections.is_empty() {
        return "No active connections".to_string();
    }

    let mut out = String::from("id: IP address                Port   Direction  Age");
    for conn in connections {
        out.push_str(&format!(
            "\n{}: {:<24} {:<6} {:<10} {}",
            conn.id,
            conn.peer.ip,
            conn.peer.port,
            conn.direction,
            conn.age_display()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanchat_core::{Direction, PeerAddr};

    #[test]
    fn test_render_empty_list() {
        assert_eq!(render_list(&[]), "No active connections");
    }

    #[test]
    fn test_render_list_rows() {
        let views = vec![
            ConnectionView::new(
                ConnectionId::new(1),
                PeerAddr::parse("127.0.0.1", "8000").unwrap(),
                Direction::Outbound,
            ),
            ConnectionView::new(
                ConnectionId::new(3),
                PeerAddr::parse("192.168.0.5", "51234").unwrap(),
                Direction::Inbound,
            ),
        ];

        let table = render_list(&views);
        let rows: Vec<&str> = table.lines().collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[1].starts_with("1: 127.0.0.1"));
        assert!(rows[1].contains("8000"));
        assert!(rows[1].contains("outbound"));
        assert!(rows[2].starts_with("3: 192.168.0.5"));
        assert!(rows[2].contains("inbound"));
    }

    #[test]
    fn test_dispatch_error_display() {
        let err = DispatchError::ConnectionNotFound {
            id: ConnectionId::new(7),
        };
        assert_eq!(err.to_string(), "no such connection: 7");
    }
}
