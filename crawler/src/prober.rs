//! Node probe abstractions for testing and mocking.
//!
//! This module provides the [`Prober`] trait that abstracts the network calls
//! the crawler makes, enabling dependency injection for testing without
//! modifying the crawl logic.

use std::future::Future;
use std::time::Duration;
use tendermint_peers_client::{ClientError, PeerDescriptor, RpcClient, TrustAnchor};

/// The network calls made against discovered nodes.
///
/// Every call is expected to be bounded by its own timeout.
pub trait Prober: Clone + Send + Sync + 'static {
    /// Fetch the peers of the node whose RPC server is at `rpc_url`.
    fn net_info(
        &self,
        rpc_url: &str,
    ) -> impl Future<Output = Result<Vec<PeerDescriptor>, ClientError>> + Send;

    /// Check the peer's p2p listener accepts connections.
    fn dial(&self, peer: &PeerDescriptor) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Ask the peer's core API for its last block height.
    fn last_block_height(
        &self,
        peer: &PeerDescriptor,
    ) -> impl Future<Output = Result<u64, ClientError>> + Send;

    /// Fetch the latest block of the node whose RPC server is at `rpc_url`.
    fn latest_block(
        &self,
        rpc_url: &str,
    ) -> impl Future<Output = Result<TrustAnchor, ClientError>> + Send;
}

/// Standard prober that talks to real nodes.
#[derive(Debug, Clone)]
pub struct NetworkProber {
    rpc: RpcClient,
    link_timeout: Duration,
    #[cfg(feature = "core-api")]
    core_api: tendermint_peers_client::CoreApiClient,
}

impl NetworkProber {
    /// Create a prober with the given per-protocol timeouts.
    pub fn new(
        rpc_timeout: Duration,
        link_timeout: Duration,
        core_api_timeout: Duration,
    ) -> Result<Self, ClientError> {
        #[cfg(not(feature = "core-api"))]
        let _ = core_api_timeout;

        Ok(NetworkProber {
            rpc: RpcClient::new(rpc_timeout)?,
            link_timeout,
            #[cfg(feature = "core-api")]
            core_api: tendermint_peers_client::CoreApiClient::new(core_api_timeout),
        })
    }
}

impl Prober for NetworkProber {
    fn net_info(
        &self,
        rpc_url: &str,
    ) -> impl Future<Output = Result<Vec<PeerDescriptor>, ClientError>> + Send {
        let rpc = self.rpc.clone();
        let rpc_url = rpc_url.to_string();
        async move { rpc.net_info(&rpc_url).await }
    }

    fn dial(&self, peer: &PeerDescriptor) -> impl Future<Output = Result<(), ClientError>> + Send {
        let address = peer.link_address();
        let timeout = self.link_timeout;
        async move { tendermint_peers_client::dial(&address, timeout).await }
    }

    #[cfg(feature = "core-api")]
    fn last_block_height(
        &self,
        peer: &PeerDescriptor,
    ) -> impl Future<Output = Result<u64, ClientError>> + Send {
        let client = self.core_api.clone();
        let address = peer.core_api_address();
        async move { client.last_block_height(&address).await }
    }

    #[cfg(not(feature = "core-api"))]
    fn last_block_height(
        &self,
        _peer: &PeerDescriptor,
    ) -> impl Future<Output = Result<u64, ClientError>> + Send {
        // Never dispatched, the builder cannot enable core API probes without the feature.
        async move {
            Err(ClientError::Io(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "Built without core API support",
            )))
        }
    }

    fn latest_block(
        &self,
        rpc_url: &str,
    ) -> impl Future<Output = Result<TrustAnchor, ClientError>> + Send {
        let rpc = self.rpc.clone();
        let rpc_url = rpc_url.to_string();
        async move { rpc.latest_block(&rpc_url).await }
    }
}

#[cfg(test)]
pub mod test_utils {
    //! Scripted prober for crawl tests.

    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct Script {
        net_info: HashMap<String, Vec<PeerDescriptor>>,
        delays: HashMap<String, Duration>,
        listening: HashSet<String>,
        core_apis: HashMap<String, u64>,
        blocks: HashMap<String, TrustAnchor>,
        calls: Vec<String>,
    }

    /// Mock prober answering from a script, anything unscripted fails.
    #[derive(Debug, Clone, Default)]
    pub struct MockProber {
        script: Arc<Mutex<Script>>,
    }

    fn unreachable(target: &str) -> ClientError {
        ClientError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            format!("No mock response for {target}"),
        ))
    }

    impl MockProber {
        pub fn new() -> Self {
            Self::default()
        }

        /// Script the peer list returned by `rpc_url`.
        pub fn add_net_info(&self, rpc_url: &str, peers: Vec<PeerDescriptor>) -> &Self {
            self.script
                .lock()
                .unwrap()
                .net_info
                .insert(rpc_url.to_string(), peers);
            self
        }

        /// Delay the `net_info` answer of `rpc_url`.
        pub fn add_delay(&self, rpc_url: &str, delay: Duration) -> &Self {
            self.script
                .lock()
                .unwrap()
                .delays
                .insert(rpc_url.to_string(), delay);
            self
        }

        /// Make the p2p listener of `remote_ip` accept connections.
        pub fn add_listening(&self, remote_ip: &str) -> &Self {
            self.script
                .lock()
                .unwrap()
                .listening
                .insert(remote_ip.to_string());
            self
        }

        pub fn add_core_api(&self, remote_ip: &str, height: u64) -> &Self {
            self.script
                .lock()
                .unwrap()
                .core_apis
                .insert(remote_ip.to_string(), height);
            self
        }

        pub fn add_block(&self, rpc_url: &str, height: u64, hash: &str) -> &Self {
            self.script.lock().unwrap().blocks.insert(
                rpc_url.to_string(),
                TrustAnchor {
                    height,
                    hash: hash.to_string(),
                },
            );
            self
        }

        /// Every call made so far, as `"<method> <target>"`.
        pub fn calls(&self) -> Vec<String> {
            self.script.lock().unwrap().calls.clone()
        }

        fn record(&self, call: String) {
            self.script.lock().unwrap().calls.push(call);
        }
    }

    impl Prober for MockProber {
        fn net_info(
            &self,
            rpc_url: &str,
        ) -> impl Future<Output = Result<Vec<PeerDescriptor>, ClientError>> + Send {
            self.record(format!("net_info {rpc_url}"));
            let (peers, delay) = {
                let script = self.script.lock().unwrap();
                (
                    script.net_info.get(rpc_url).cloned(),
                    script.delays.get(rpc_url).copied(),
                )
            };
            let rpc_url = rpc_url.to_string();
            async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                peers.ok_or_else(|| unreachable(&rpc_url))
            }
        }

        fn dial(
            &self,
            peer: &PeerDescriptor,
        ) -> impl Future<Output = Result<(), ClientError>> + Send {
            self.record(format!("dial {}", peer.link_address()));
            let listening = self
                .script
                .lock()
                .unwrap()
                .listening
                .contains(&peer.remote_ip);
            let address = peer.link_address();
            async move {
                if listening {
                    Ok(())
                } else {
                    Err(unreachable(&address))
                }
            }
        }

        fn last_block_height(
            &self,
            peer: &PeerDescriptor,
        ) -> impl Future<Output = Result<u64, ClientError>> + Send {
            self.record(format!("last_block_height {}", peer.core_api_address()));
            let height = self
                .script
                .lock()
                .unwrap()
                .core_apis
                .get(&peer.remote_ip)
                .copied();
            let address = peer.core_api_address();
            async move { height.ok_or_else(|| unreachable(&address)) }
        }

        fn latest_block(
            &self,
            rpc_url: &str,
        ) -> impl Future<Output = Result<TrustAnchor, ClientError>> + Send {
            self.record(format!("latest_block {rpc_url}"));
            let block = self.script.lock().unwrap().blocks.get(rpc_url).cloned();
            let rpc_url = rpc_url.to_string();
            async move { block.ok_or_else(|| unreachable(&rpc_url)) }
        }
    }
}
