//! Network identity of a remote peer.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::error::{DomainError, DomainResult};

/// The `(ip, port)` pair a connection is attached to.
///
/// For inbound links this is the address observed on the accepted socket
/// (so the port is the peer's ephemeral port, not its listen port).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerAddr {
    pub ip: IpAddr,
    pub port: u16,
}

impl PeerAddr {
    /// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) are stored as plain
    /// IPv4, so one peer always has one identity.
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self {
            ip: ip.to_canonical(),
            port,
        }
    }

    /// Parses the `<ip> <port>` arguments of a `connect` command.
    ///
    /// Port 0 is rejected because it can never be dialed.
    pub fn parse(ip: &str, port: &str) -> DomainResult<Self> {
        let ip: IpAddr = ip.parse().map_err(|_| DomainError::InvalidAddress {
            value: ip.to_string(),
        })?;

        let port = match port.parse::<u16>() {
            Ok(p) if p != 0 => p,
            _ => {
                return Err(DomainError::InvalidPort {
                    value: port.to_string(),
                })
            }
        };

        Ok(Self::new(ip, port))
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

impl From<SocketAddr> for PeerAddr {
    fn from(addr: SocketAddr) -> Self {
        // Dual-stack sockets report IPv4 peers as mapped v6 addresses
        Self::new(addr.ip(), addr.port())
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.socket_addr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_parse_valid() {
        let peer = PeerAddr::parse("192.168.1.20", "8000").unwrap();
        assert_eq!(peer.ip, IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)));
        assert_eq!(peer.port, 8000);
    }

    #[test]
    fn test_parse_rejects_bad_address() {
        let err = PeerAddr::parse("300.1.1.1", "8000").unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidAddress {
                value: "300.1.1.1".to_string()
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_port() {
        assert!(matches!(
            PeerAddr::parse("10.0.0.1", "0"),
            Err(DomainError::InvalidPort { .. })
        ));
        assert!(matches!(
            PeerAddr::parse("10.0.0.1", "70000"),
            Err(DomainError::InvalidPort { .. })
        ));
        assert!(matches!(
            PeerAddr::parse("10.0.0.1", "http"),
            Err(DomainError::InvalidPort { .. })
        ));
    }

    #[test]
    fn test_from_mapped_v6_socket_addr() {
        let mapped = Ipv4Addr::new(10, 0, 0, 7).to_ipv6_mapped();
        let addr = SocketAddr::new(IpAddr::V6(mapped), 4000);
        let peer = PeerAddr::from(addr);
        assert_eq!(peer.ip, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)));

        let native = SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 4000);
        assert_eq!(PeerAddr::from(native).ip, IpAddr::V6(Ipv6Addr::LOCALHOST));
    }

    #[test]
    fn test_parse_unmaps_ipv4_mapped_address() {
        let mapped = PeerAddr::parse("::ffff:127.0.0.1", "8000").unwrap();
        let plain = PeerAddr::parse("127.0.0.1", "8000").unwrap();
        assert_eq!(mapped, plain);
        assert!(mapped.ip.is_loopback());

        let native = PeerAddr::parse("::1", "8000").unwrap();
        assert_eq!(native.ip, IpAddr::V6(Ipv6Addr::LOCALHOST));
    }

    #[test]
    fn test_parse_matches_observed_socket_addr() {
        let typed = PeerAddr::parse("::ffff:10.0.0.7", "4000").unwrap();
        let mapped = Ipv4Addr::new(10, 0, 0, 7).to_ipv6_mapped();
        let observed = PeerAddr::from(SocketAddr::new(IpAddr::V6(mapped), 4000));
        assert_eq!(typed, observed);
    }

    #[test]
    fn test_display() {
        let peer = PeerAddr::parse("127.0.0.1", "8001").unwrap();
        assert_eq!(peer.to_string(), "127.0.0.1:8001");
    }
}
