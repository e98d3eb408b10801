//! Connection identity, direction and lifecycle state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::DomainError;
use crate::peer::PeerAddr;

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Process-local identifier of a peer connection.
///
/// Assigned by the registry starting at 1 and never reused, even after
/// the connection it named has been terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// The first id handed out by a fresh registry.
    pub const FIRST: Self = Self(1);

    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Returns the id that follows this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConnectionId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|_| DomainError::InvalidConnectionId {
                value: s.to_string(),
            })
    }
}

// ============================================================================
// Direction & State
// ============================================================================

/// Which side opened the link. Recorded for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Accepted by our listener
    Inbound,
    /// Dialed by our `connect` command
    Outbound,
}

impl Direction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Lifecycle of a connection.
///
/// ```text
/// Active ──(terminate / exit / peer EOF)──▶ Closing ──(receiver exited)──▶ Closed
/// ```
///
/// Only `Active` connections live in the registry. Removal is the
/// `Active -> Closing` edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Active,
    Closing,
    Closed,
}

impl ConnectionState {
    /// Checks whether moving to `next` is a legal lifecycle step.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Closing) | (Self::Closing, Self::Closed)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Active => "active",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(label)
    }
}

// ============================================================================
// Read Model
// ============================================================================

/// Snapshot of one registry entry, safe to hand out to any task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionView {
    pub id: ConnectionId,
    pub peer: PeerAddr,
    pub direction: Direction,
    pub state: ConnectionState,
    pub connected_at: DateTime<Utc>,
}

impl ConnectionView {
    pub fn new(id: ConnectionId, peer: PeerAddr, direction: Direction) -> Self {
        Self {
            id,
            peer,
            direction,
            state: ConnectionState::Active,
            connected_at: Utc::now(),
        }
    }

    /// Returns how long the link has been up.
    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.connected_at)
    }

    /// Returns the link age in a compact form for `list` output.
    pub fn age_display(&self) -> String {
        format_age(self.age())
    }
}

fn format_age(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds();
    if secs < 0 {
        return "0s".to_string();
    }
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn test_peer() -> PeerAddr {
        PeerAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000)
    }

    #[test]
    fn test_connection_id_sequence() {
        let first = ConnectionId::FIRST;
        assert_eq!(first.get(), 1);
        assert_eq!(first.next().get(), 2);
        assert!(first < first.next());
    }

    #[test]
    fn test_connection_id_from_str() {
        assert_eq!("42".parse::<ConnectionId>(), Ok(ConnectionId::new(42)));
        assert!(matches!(
            "-1".parse::<ConnectionId>(),
            Err(DomainError::InvalidConnectionId { .. })
        ));
        assert!(matches!(
            "abc".parse::<ConnectionId>(),
            Err(DomainError::InvalidConnectionId { .. })
        ));
    }

    #[test]
    fn test_state_transitions() {
        use ConnectionState::*;
        assert!(Active.can_transition_to(Closing));
        assert!(Closing.can_transition_to(Closed));
        assert!(!Active.can_transition_to(Closed));
        assert!(!Closed.can_transition_to(Active));
        assert!(!Closing.can_transition_to(Active));
    }

    #[test]
    fn test_new_view_is_active() {
        let view = ConnectionView::new(ConnectionId::FIRST, test_peer(), Direction::Outbound);
        assert_eq!(view.state, ConnectionState::Active);
        assert_eq!(view.direction.to_string(), "outbound");
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(chrono::Duration::seconds(-5)), "0s");
        assert_eq!(format_age(chrono::Duration::seconds(42)), "42s");
        assert_eq!(format_age(chrono::Duration::seconds(125)), "2m");
        assert_eq!(format_age(chrono::Duration::seconds(7200)), "2h");
        assert_eq!(format_age(chrono::Duration::seconds(90000)), "1d");
    }
}
