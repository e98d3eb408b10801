//! Wiring of one chat node: the shared handles every worker needs.

use lanchat_core::PeerAddr;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

use crate::config::NodeConfig;
use crate::connector::Connector;
use crate::dispatcher::Dispatcher;
use crate::display::DisplayHandle;
use crate::netinfo::{local_ip, LocalIdentity};
use crate::registry::{spawn_registry, RegistryHandle};
use crate::server::{bind_listener, Listener, ServerError};

/// Handles shared by the listener, receivers, connector and dispatcher.
///
/// Created once at startup and torn down by [`crate::shutdown::shutdown`].
/// Cloning is cheap; every field is itself a handle.
#[derive(Clone)]
pub struct Node {
    registry: RegistryHandle,
    display: DisplayHandle,
    /// Every receiver task is spawned on this tracker so shutdown can
    /// wait for them.
    receivers: TaskTracker,
    /// Stops the listener's accept loop.
    cancel_token: CancellationToken,
    identity: LocalIdentity,
    config: NodeConfig,
}

impl Node {
    /// Binds the listen port and spawns the registry.
    ///
    /// The returned [`Listener`] has not started accepting yet; run it on
    /// its own task.
    ///
    /// # Errors
    ///
    /// `ServerError::BindFailed` if the port cannot be bound. This is the
    /// one unrecoverable startup error.
    pub async fn start(
        config: NodeConfig,
        display: DisplayHandle,
    ) -> Result<(Self, Listener), ServerError> {
        let tcp = bind_listener(config.port).await?;
        let bound = tcp.local_addr().map_err(|e| ServerError::BindFailed {
            port: config.port,
            error: e.to_string(),
        })?;

        let identity = LocalIdentity::new(local_ip(), bound.port());
        info!(
            lan_ip = %identity.lan_ip,
            port = identity.listen_port,
            "Node started"
        );

        let node = Self {
            registry: spawn_registry(),
            display,
            receivers: TaskTracker::new(),
            cancel_token: CancellationToken::new(),
            identity,
            config,
        };
        let listener = Listener::new(tcp, node.clone());
        Ok((node, listener))
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    pub fn display(&self) -> &DisplayHandle {
        &self.display
    }

    pub fn identity(&self) -> LocalIdentity {
        self.identity
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Address peers on this host can dial us at.
    pub fn loopback_addr(&self) -> PeerAddr {
        PeerAddr::new(
            std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
            self.identity.listen_port,
        )
    }

    pub fn connector(&self) -> Connector {
        Connector::new(self.clone())
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.clone())
    }

    pub(crate) fn receivers(&self) -> &TaskTracker {
        &self.receivers
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }
}
