//! Per-connection receive loop.
//!
//! Each registered connection gets exactly one `Receiver` task that:
//! - Reads newline-delimited messages and shows them on the display
//! - Detects peer close or read failure and deregisters the connection
//! - Stops as soon as the registry fires the connection's close signal
//!
//! Receivers never touch the registry while reading, and never block
//! each other: every read is on its own socket and its own task.

use lanchat_core::{ConnectionId, ConnectionState, PeerAddr};
use lanchat_protocol::{decode_line, ProtocolError, MAX_LINE_BYTES};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::display::DisplayHandle;
use crate::node::Node;
use crate::registry::{Registration, RegistryHandle, RemovalReason};

/// Errors that end a receive loop.
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ReceiverError {
    fn removal_reason(&self) -> RemovalReason {
        match self {
            Self::Io(_) => RemovalReason::ReadFailed,
            Self::Protocol(_) => RemovalReason::ProtocolViolation,
        }
    }
}

/// Why the read loop stopped.
#[derive(Debug)]
enum ReceiverExit {
    /// Registry removed us (terminate / exit); nothing left to clean up.
    LocalClose,
    /// Peer sent EOF.
    PeerClosed,
    /// Read failed or the peer broke framing.
    Failed(ReceiverError),
}

/// Reads one `\n`-terminated line.
///
/// Returns `Ok(None)` at end of stream. A final line without a terminator
/// is still delivered before the EOF.
///
/// # Errors
///
/// - `ReceiverError::Protocol` if `MAX_LINE_BYTES` arrive without a newline
/// - `ReceiverError::Io` if the socket read fails
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<String>, ReceiverError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let limit = MAX_LINE_BYTES as u64;

    let n = (&mut *reader)
        .take(limit)
        .read_until(b'\n', &mut buf)
        .await
        .map_err(|e| ReceiverError::Io(e.to_string()))?;

    if n == 0 {
        return Ok(None);
    }

    if buf.last() != Some(&b'\n') && n as u64 >= limit {
        return Err(ProtocolError::LineTooLong {
            max: MAX_LINE_BYTES,
        }
        .into());
    }

    Ok(Some(decode_line(&buf)))
}

/// Receive loop for one connection.
pub struct Receiver {
    id: ConnectionId,
    peer: PeerAddr,
    reader: BufReader<OwnedReadHalf>,
    closed: CancellationToken,
    state: ConnectionState,
    registry: RegistryHandle,
    display: DisplayHandle,
}

impl Receiver {
    pub fn new(
        registration: Registration,
        peer: PeerAddr,
        reader: OwnedReadHalf,
        registry: RegistryHandle,
        display: DisplayHandle,
    ) -> Self {
        Self {
            id: registration.id,
            peer,
            reader: BufReader::new(reader),
            closed: registration.closed,
            state: ConnectionState::Active,
            registry,
            display,
        }
    }

    /// Runs until the stream ends or the registry closes the connection.
    pub async fn run(mut self) {
        debug!(id = %self.id, peer = %self.peer, "Receiver started");

        let closed = self.closed.clone();
        let exit = tokio::select! {
            _ = closed.cancelled() => ReceiverExit::LocalClose,
            exit = self.read_loop() => exit,
        };

        self.transition(ConnectionState::Closing);

        match exit {
            ReceiverExit::LocalClose => {
                debug!(id = %self.id, "Connection closed locally");
            }
            ReceiverExit::PeerClosed => {
                self.deregister(RemovalReason::PeerClosed).await;
            }
            ReceiverExit::Failed(e) => {
                warn!(id = %self.id, peer = %self.peer, error = %e, "Receive failed");
                self.deregister(e.removal_reason()).await;
            }
        }

        self.transition(ConnectionState::Closed);
        // Dropping self releases the read half; together with the registry
        // dropping the write half this closes the socket.
    }

    async fn read_loop(&mut self) -> ReceiverExit {
        loop {
            match read_frame(&mut self.reader).await {
                Ok(Some(line)) => self.deliver(&line),
                Ok(None) => return ReceiverExit::PeerClosed,
                Err(e) => return ReceiverExit::Failed(e),
            }
        }
    }

    fn deliver(&self, text: &str) {
        debug!(id = %self.id, bytes = text.len(), "Message received");
        self.display.notice(format!(
            "Message received from {} (connection {})\nSender's Port: {}\nMessage: \"{}\"",
            self.peer.ip, self.id, self.peer.port, text
        ));
    }

    /// Removes the connection unless a `terminate` already did.
    async fn deregister(&self, reason: RemovalReason) {
        if self.registry.remove(self.id, reason).await {
            self.display.notice(format!(
                "Connection {} ({}) has been terminated: {}",
                self.id, self.peer, reason
            ));
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state.can_transition_to(next) {
            debug!(id = %self.id, from = %self.state, to = %next, "Connection state changed");
            self.state = next;
        }
    }
}

/// Spawns the receiver for a freshly registered connection.
pub(crate) fn spawn_receiver(
    node: &Node,
    registration: Registration,
    peer: PeerAddr,
    reader: OwnedReadHalf,
) {
    let receiver = Receiver::new(
        registration,
        peer,
        reader,
        node.registry().clone(),
        node.display().clone(),
    );
    node.receivers().spawn(receiver.run());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_frame_sequence() {
        let mut reader: &[u8] = b"hello\nworld\r\ntail";

        assert_eq!(read_frame(&mut reader).await.unwrap().as_deref(), Some("hello"));
        assert_eq!(read_frame(&mut reader).await.unwrap().as_deref(), Some("world"));
        assert_eq!(read_frame(&mut reader).await.unwrap().as_deref(), Some("tail"));
        assert_eq!(read_frame(&mut reader).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_frame_rejects_oversized_line() {
        let data = vec![b'x'; MAX_LINE_BYTES + 10];
        let mut reader: &[u8] = &data;

        let err = read_frame(&mut reader).await.unwrap_err();
        assert!(matches!(
            err,
            ReceiverError::Protocol(ProtocolError::LineTooLong { .. })
        ));
        assert_eq!(err.removal_reason(), RemovalReason::ProtocolViolation);
    }

    #[tokio::test]
    async fn test_read_frame_accepts_line_at_limit() {
        let mut data = vec![b'y'; MAX_LINE_BYTES - 1];
        data.push(b'\n');
        let mut reader: &[u8] = &data;

        let line = read_frame(&mut reader).await.unwrap().unwrap();
        assert_eq!(line.len(), MAX_LINE_BYTES - 1);
    }
}
