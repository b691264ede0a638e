//! Shared record of admitted peers and the chain they must all be on.

use log::debug;
use std::collections::HashSet;
use std::error::Error;
use std::fmt;
use tendermint_peers_client::PeerDescriptor;
use tokio::sync::Mutex;

/// Two nodes reported different chain IDs.
///
/// Fatal for a crawl, continuing would mix the topology of two unrelated
/// networks into one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConflict {
    /// The chain ID the crawl had already settled on.
    pub expected: String,
    /// The chain ID that disagreed.
    pub got: String,
    /// Remote IP of the peer that reported `got`, if known.
    pub remote_ip: Option<String>,
}

impl fmt::Display for IdentityConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Multiple chain IDs detected, expected {:?} but got {:?}",
            self.expected, self.got
        )?;
        if let Some(remote_ip) = &self.remote_ip {
            write!(f, " from peer {remote_ip}")?;
        }
        write!(f, ", ensure all initial RPCs are on the same network")
    }
}

impl Error for IdentityConflict {}

#[derive(Debug, Default)]
struct RegistryState {
    admitted: HashSet<String>,
    chain_id: Option<String>,
}

impl RegistryState {
    fn check_identity(&mut self, id: &str) -> Result<(), IdentityConflict> {
        match &self.chain_id {
            // A peer without a network says nothing about the chain.
            None if id.is_empty() => Ok(()),
            None => {
                self.chain_id = Some(id.to_string());
                Ok(())
            }
            Some(expected) if expected == id => Ok(()),
            Some(expected) => Err(IdentityConflict {
                expected: expected.clone(),
                got: id.to_string(),
                remote_ip: None,
            }),
        }
    }
}

/// Peers admitted for probing plus the agreed chain ID.
///
/// All state sits behind one lock so that "is this address new" and "mark
/// it as seen" are a single step. Exactly one caller is told an address is
/// new, however many race on it.
#[derive(Debug, Default)]
pub struct Registry {
    state: Mutex<RegistryState>,
}

impl Registry {
    /// Create a registry, optionally pinned to a known chain ID.
    ///
    /// An empty chain ID is treated as unknown, the first one observed is adopted.
    pub fn new(chain_id: Option<String>) -> Self {
        Registry {
            state: Mutex::new(RegistryState {
                admitted: HashSet::new(),
                chain_id: chain_id.filter(|id| !id.is_empty()),
            }),
        }
    }

    /// Admit `address` if it has not been admitted before.
    ///
    /// # Returns
    ///
    /// `true` if this call admitted the address, `false` if it was already known.
    pub async fn try_admit(&self, address: &str) -> bool {
        self.state.lock().await.admitted.insert(address.to_string())
    }

    /// Adopt `id` as the chain ID if none is set, otherwise check it matches.
    ///
    /// An empty `id` is never adopted.
    pub async fn set_or_check_identity(&self, id: &str) -> Result<(), IdentityConflict> {
        self.state.lock().await.check_identity(id)
    }

    /// Check a peer's chain ID and admit its address, as one step.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The peer is new and should be probed.
    /// * `Ok(false)` - The peer was admitted before, or has no address to probe.
    /// * `Err(IdentityConflict)` - The peer is on a different chain.
    pub async fn admit(&self, peer: &PeerDescriptor) -> Result<bool, IdentityConflict> {
        let mut state = self.state.lock().await;
        state
            .check_identity(&peer.network)
            .map_err(|conflict| IdentityConflict {
                remote_ip: (!peer.remote_ip.is_empty()).then(|| peer.remote_ip.clone()),
                ..conflict
            })?;
        if peer.remote_ip.is_empty() {
            debug!("Not probing peer {} without a remote IP", peer.node_id);
            return Ok(false);
        }
        Ok(state.admitted.insert(peer.remote_ip.clone()))
    }

    /// The chain ID the crawl has settled on, if any.
    pub async fn chain_id(&self) -> Option<String> {
        self.state.lock().await.chain_id.clone()
    }

    /// Number of admitted addresses.
    pub async fn len(&self) -> usize {
        self.state.lock().await.admitted.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_try_admit_once_per_address_under_contention() {
        let registry = Arc::new(Registry::new(None));
        let mut handles = Vec::new();

        // 16 tasks race over the same 50 addresses, each in its own order.
        for task in 0..16usize {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let mut admitted = Vec::new();
                for i in 0..50usize {
                    let address = format!("10.0.0.{}", (i * 7 + task) % 50);
                    if registry.try_admit(&address).await {
                        admitted.push(address);
                    }
                }
                admitted
            }));
        }

        let mut all_admitted = Vec::new();
        for handle in handles {
            all_admitted.extend(handle.await.unwrap());
        }

        let distinct: HashSet<_> = all_admitted.iter().cloned().collect();
        assert_eq!(all_admitted.len(), 50);
        assert_eq!(distinct.len(), 50);
        assert_eq!(registry.len().await, 50);
    }

    #[tokio::test]
    async fn test_identity_adopted_then_enforced() {
        let registry = Registry::new(None);

        for _ in 0..3 {
            assert!(registry.set_or_check_identity("net-x").await.is_ok());
        }
        assert_eq!(registry.chain_id().await.as_deref(), Some("net-x"));

        let conflict = registry.set_or_check_identity("net-y").await.unwrap_err();
        assert_eq!(conflict.expected, "net-x");
        assert_eq!(conflict.got, "net-y");
        assert_eq!(conflict.remote_ip, None);

        // The first identity stays in force.
        assert_eq!(registry.chain_id().await.as_deref(), Some("net-x"));
    }

    #[tokio::test]
    async fn test_configured_identity() {
        let registry = Registry::new(Some("vega-mainnet-0011".to_string()));

        let conflict = registry.set_or_check_identity("net-x").await.unwrap_err();
        assert_eq!(conflict.expected, "vega-mainnet-0011");

        let registry = Registry::new(Some(String::new()));
        assert!(registry.set_or_check_identity("net-x").await.is_ok());
    }

    #[tokio::test]
    async fn test_admit_checks_identity_before_admitting() {
        let registry = Registry::new(None);

        let a = PeerDescriptor::new("1.1.1.1", "a", "net-x");
        let b = PeerDescriptor::new("2.2.2.2", "b", "net-y");

        assert_eq!(registry.admit(&a).await, Ok(true));
        assert_eq!(registry.admit(&a).await, Ok(false));

        let conflict = registry.admit(&b).await.unwrap_err();
        assert_eq!(conflict.expected, "net-x");
        assert_eq!(conflict.got, "net-y");
        assert_eq!(conflict.remote_ip.as_deref(), Some("2.2.2.2"));
        assert!(conflict.to_string().contains("2.2.2.2"));

        // The conflicting peer was not admitted.
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_empty_network_is_not_adopted() {
        let registry = Registry::new(None);

        let unnamed = PeerDescriptor::new("1.1.1.1", "a", "");
        let named = PeerDescriptor::new("2.2.2.2", "b", "net-x");

        assert_eq!(registry.admit(&unnamed).await, Ok(true));
        assert_eq!(registry.chain_id().await, None);
        assert_eq!(registry.admit(&named).await, Ok(true));
        assert_eq!(registry.chain_id().await.as_deref(), Some("net-x"));
    }

    #[tokio::test]
    async fn test_peer_without_ip_is_checked_but_not_admitted() {
        let registry = Registry::new(Some("net-x".to_string()));

        let same_chain = PeerDescriptor::new("", "a", "net-x");
        assert_eq!(registry.admit(&same_chain).await, Ok(false));
        assert!(registry.is_empty().await);

        let other_chain = PeerDescriptor::new("", "b", "net-y");
        let conflict = registry.admit(&other_chain).await.unwrap_err();
        assert_eq!(conflict.got, "net-y");
        assert_eq!(conflict.remote_ip, None);
    }
}
