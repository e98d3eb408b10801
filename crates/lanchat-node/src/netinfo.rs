//! Local network identity: the LAN address shown by `myip` and used to
//! recognise self-connects.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use lanchat_core::PeerAddr;
use tracing::debug;

/// Any routable address works as the probe target; no packet is sent.
const PROBE_TARGET: &str = "10.255.255.255:1";

/// Returns the address of the interface the host would route LAN traffic
/// through, or `127.0.0.1` if there is no usable route.
///
/// `connect` on a UDP socket only selects a route and a source address,
/// so this never blocks on the network.
pub fn local_ip() -> IpAddr {
    let probe = || -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect(PROBE_TARGET)?;
        Ok(socket.local_addr()?.ip())
    };

    match probe() {
        Ok(ip) if !ip.is_unspecified() => ip,
        Ok(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
        Err(e) => {
            debug!(error = %e, "No routable interface, falling back to loopback");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

/// The process's own listening identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalIdentity {
    /// Address reported by `myip`
    pub lan_ip: IpAddr,
    /// Port the listener is bound to
    pub listen_port: u16,
}

impl LocalIdentity {
    pub fn new(lan_ip: IpAddr, listen_port: u16) -> Self {
        Self {
            lan_ip,
            listen_port,
        }
    }

    /// Checks whether dialing `peer` would reach our own listener.
    ///
    /// The listener binds every interface, so loopback and the unspecified
    /// address count as ourselves alongside the LAN address.
    pub fn is_self(&self, peer: &PeerAddr) -> bool {
        let ip = peer.ip.to_canonical();
        peer.port == self.listen_port
            && (ip == self.lan_ip || ip.is_loopback() || ip.is_unspecified())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> LocalIdentity {
        LocalIdentity::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)), 8000)
    }

    #[test]
    fn test_is_self_matches_own_addresses() {
        let me = identity();
        assert!(me.is_self(&PeerAddr::parse("192.168.1.20", "8000").unwrap()));
        assert!(me.is_self(&PeerAddr::parse("127.0.0.1", "8000").unwrap()));
        assert!(me.is_self(&PeerAddr::parse("0.0.0.0", "8000").unwrap()));
        assert!(me.is_self(&PeerAddr::parse("::1", "8000").unwrap()));
    }

    #[test]
    fn test_is_self_matches_ipv4_mapped_forms() {
        let me = identity();
        assert!(me.is_self(&PeerAddr::parse("::ffff:127.0.0.1", "8000").unwrap()));
        assert!(me.is_self(&PeerAddr::parse("::ffff:192.168.1.20", "8000").unwrap()));

        // Bypasses the constructor, as a struct literal would
        let raw = PeerAddr {
            ip: IpAddr::V6(Ipv4Addr::LOCALHOST.to_ipv6_mapped()),
            port: 8000,
        };
        assert!(me.is_self(&raw));
    }

    #[test]
    fn test_is_self_rejects_other_ports_and_hosts() {
        let me = identity();
        assert!(!me.is_self(&PeerAddr::parse("127.0.0.1", "8001").unwrap()));
        assert!(!me.is_self(&PeerAddr::parse("192.168.1.21", "8000").unwrap()));
    }

    #[test]
    fn test_local_ip_is_concrete() {
        assert!(!local_ip().is_unspecified());
    }
}
