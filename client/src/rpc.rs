//! Tendermint JSON-RPC over HTTP.
//!
//! Only the two endpoints the crawler needs are modelled, `net_info` for
//! peer discovery and `block` for the state-sync trust anchor. Decoding is
//! permissive, unknown fields are ignored and an absent peer list is an
//! empty one.

use crate::error::ClientError;
use crate::peer::PeerDescriptor;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// JSON-RPC 2.0 response envelope returned by every tendermint endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse<T> {
    #[serde(default)]
    pub jsonrpc: String,
    /// Request ID echoed back, a number or a string depending on the node version.
    #[serde(default)]
    pub id: serde_json::Value,
    pub result: Option<T>,
    pub error: Option<RpcErrorObject>,
}

/// Error member of a JSON-RPC response.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl<T> RpcResponse<T> {
    /// Splits the envelope into its result, surfacing an error member as [`ClientError::Rpc`].
    fn into_result(self) -> Result<Option<T>, ClientError> {
        match self.error {
            Some(err) => {
                let message = match err.data {
                    Some(serde_json::Value::String(data)) if !data.is_empty() => {
                        format!("{} ({data})", err.message)
                    }
                    _ => err.message,
                };
                Err(ClientError::Rpc {
                    code: err.code,
                    message,
                })
            }
            None => Ok(self.result),
        }
    }
}

/// Response of `GET /net_info`.
pub type NetInfoResponse = RpcResponse<NetInfo>;

/// Response of `GET /block`.
pub type BlockResponse = RpcResponse<BlockResult>;

/// Result member of a `net_info` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetInfo {
    /// Connected peers, `null` or missing on nodes without any.
    #[serde(default)]
    pub peers: Option<Vec<RemotePeer>>,
}

/// One entry of the `net_info` peer list.
#[derive(Debug, Clone, Deserialize)]
pub struct RemotePeer {
    #[serde(default)]
    pub remote_ip: String,
    #[serde(default)]
    pub node_info: NodeInfo,
}

/// Self-reported information of a peer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub network: String,
}

impl NetInfo {
    /// Converts the peer list into descriptors, in the order the node reported them.
    ///
    /// Entries without a remote IP are kept, their network still counts
    /// towards the chain identity even though they cannot be probed.
    pub fn into_peers(self) -> Vec<PeerDescriptor> {
        self.peers
            .unwrap_or_default()
            .into_iter()
            .map(|peer| PeerDescriptor {
                remote_ip: peer.remote_ip,
                node_id: peer.node_info.id,
                network: peer.node_info.network,
            })
            .collect()
    }
}

/// Result member of a `block` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockResult {
    #[serde(default)]
    pub block_id: BlockId,
    #[serde(default)]
    pub block: Block,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockId {
    pub hash: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub header: Header,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Header {
    /// Block height, encoded as a decimal string by tendermint.
    pub height: Option<serde_json::Value>,
}

/// A block height and hash a new node can trust when state syncing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustAnchor {
    pub height: u64,
    pub hash: String,
}

impl BlockResult {
    /// Extracts the height and hash of the block.
    ///
    /// # Returns
    ///
    /// * `Ok(TrustAnchor)` - If both are present and the height is an unsigned integer.
    /// * `Err(ClientError)` - If either is missing or the height is malformed.
    pub fn trust_anchor(&self) -> Result<TrustAnchor, ClientError> {
        let hash = match &self.block_id.hash {
            Some(hash) if !hash.is_empty() => hash.clone(),
            _ => return Err(ClientError::MissingField("result.block_id.hash")),
        };
        let height = match &self.block.header.height {
            Some(serde_json::Value::String(height)) => height
                .parse::<u64>()
                .map_err(|_| ClientError::InvalidHeight(height.clone()))?,
            Some(serde_json::Value::Number(height)) => height
                .as_u64()
                .ok_or_else(|| ClientError::InvalidHeight(height.to_string()))?,
            Some(other) => return Err(ClientError::InvalidHeight(other.to_string())),
            None => return Err(ClientError::MissingField("result.block.header.height")),
        };

        Ok(TrustAnchor { height, hash })
    }
}

/// HTTP client for a node's tendermint RPC server.
///
/// Cheap to clone, clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
}

impl RpcClient {
    /// Create a client whose requests are bounded by `timeout`.
    ///
    /// The timeout covers the whole request, from connecting to reading the body.
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Http)?;
        Ok(RpcClient { http })
    }

    /// Fetch the peers a node is connected to.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the node's RPC server, e.g. `http://1.2.3.4:26657`.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<PeerDescriptor>)` - The node's peers, possibly empty.
    /// * `Err(ClientError)` - On transport failure, error status or undecodable body.
    pub async fn net_info(&self, base_url: &str) -> Result<Vec<PeerDescriptor>, ClientError> {
        let response: NetInfoResponse = self.get(base_url, "net_info").await?;
        let peers = response.into_result()?.unwrap_or_default().into_peers();
        debug!("{base_url} reported {} peers", peers.len());
        Ok(peers)
    }

    /// Fetch the node's latest block and extract its height and hash.
    pub async fn latest_block(&self, base_url: &str) -> Result<TrustAnchor, ClientError> {
        let response: BlockResponse = self.get(base_url, "block").await?;
        response
            .into_result()?
            .ok_or(ClientError::MissingField("result"))?
            .trust_anchor()
    }

    async fn get<T: DeserializeOwned>(
        &self,
        base_url: &str,
        endpoint: &str,
    ) -> Result<T, ClientError> {
        let url = format!("{}/{endpoint}", base_url.trim_end_matches('/'));
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
