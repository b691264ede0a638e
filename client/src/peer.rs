//! Tendermint peer information and probe address derivation.

use std::fmt;
use std::net::IpAddr;

/// Port of a node's HTTP JSON-RPC server.
pub const RPC_PORT: u16 = 26657;
/// Port of a node's peer-to-peer listener.
pub const P2P_PORT: u16 = 26656;
/// Port of a vega node's gRPC core API.
pub const CORE_API_PORT: u16 = 3002;

/// A peer reported by a node's `net_info` endpoint.
///
/// Only the fields the crawler acts on are kept. The `remote_ip` is the
/// identity of the peer for deduplication purposes, the same node reported
/// by several neighbours is only probed once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerDescriptor {
    /// Address the reporting node sees the peer connecting from.
    pub remote_ip: String,
    /// The peer's node ID, the hex encoded address of its p2p key.
    pub node_id: String,
    /// The chain ID the peer claims to be on.
    pub network: String,
}

impl PeerDescriptor {
    /// Create a new peer descriptor.
    pub fn new<S1, S2, S3>(remote_ip: S1, node_id: S2, network: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        PeerDescriptor {
            remote_ip: remote_ip.into(),
            node_id: node_id.into(),
            network: network.into(),
        }
    }

    /// Base URL of the peer's RPC server, e.g. `http://1.2.3.4:26657`.
    pub fn rpc_url(&self) -> String {
        format!("http://{}", self.host_port(RPC_PORT))
    }

    /// Socket address of the peer's p2p listener, e.g. `1.2.3.4:26656`.
    pub fn link_address(&self) -> String {
        self.host_port(P2P_PORT)
    }

    /// Socket address of the peer's core API, e.g. `1.2.3.4:3002`.
    pub fn core_api_address(&self) -> String {
        self.host_port(CORE_API_PORT)
    }

    /// The peer in `persistent_peers` notation, `<node_id>@<ip>:26656`.
    pub fn persistent_peer(&self) -> String {
        format!("{}@{}", self.node_id, self.link_address())
    }

    fn host_port(&self, port: u16) -> String {
        match self.remote_ip.parse::<IpAddr>() {
            Ok(IpAddr::V6(ipv6)) => format!("[{ipv6}]:{port}"),
            _ => format!("{}:{port}", self.remote_ip),
        }
    }
}

impl fmt::Display for PeerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ([peer] id: {}, network: {})",
            self.remote_ip, self.node_id, self.network
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_addresses_ipv4() {
        let peer = PeerDescriptor::new("1.1.1.1", "abcd", "net-x");

        assert_eq!(peer.rpc_url(), "http://1.1.1.1:26657");
        assert_eq!(peer.link_address(), "1.1.1.1:26656");
        assert_eq!(peer.core_api_address(), "1.1.1.1:3002");
        assert_eq!(peer.persistent_peer(), "abcd@1.1.1.1:26656");
    }

    #[test]
    fn test_probe_addresses_ipv6_are_bracketed() {
        let peer = PeerDescriptor::new("2001:db8::1", "abcd", "net-x");

        assert_eq!(peer.rpc_url(), "http://[2001:db8::1]:26657");
        assert_eq!(peer.link_address(), "[2001:db8::1]:26656");
    }

    #[test]
    fn test_hostname_is_passed_through() {
        let peer = PeerDescriptor::new("node.example", "abcd", "net-x");

        assert_eq!(peer.link_address(), "node.example:26656");
    }
}
