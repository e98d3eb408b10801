//! Node configuration.

use std::time::Duration;

/// Default bound on an outbound dial.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Bound on a single `send` write before the peer is treated as gone.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// How long `exit` waits for receivers to wind down.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Runtime settings for one chat node.
///
/// # Example
///
/// ```rust
/// use lanchat_node::config::NodeConfig;
/// use std::time::Duration;
///
/// let config = NodeConfig {
///     connect_timeout: Duration::from_secs(2),
///     ..NodeConfig::new(8000)
/// };
/// assert_eq!(config.port, 8000);
/// ```
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Listen port. 0 asks the OS for a free port (tests).
    pub port: u16,

    /// Bound on `connect` dials.
    pub connect_timeout: Duration,

    /// Bound on each `send` write.
    pub write_timeout: Duration,

    /// Bound on waiting for receivers during shutdown.
    pub shutdown_grace: Duration,
}

impl NodeConfig {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            port: 0,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}
