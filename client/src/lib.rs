mod error;
mod link;
mod peer;
mod rpc;

#[cfg(feature = "core-api")]
mod core_api;

pub use error::ClientError;
pub use link::dial;
pub use peer::{PeerDescriptor, CORE_API_PORT, P2P_PORT, RPC_PORT};
pub use rpc::{
    Block, BlockId, BlockResponse, BlockResult, Header, NetInfo, NetInfoResponse, NodeInfo,
    RemotePeer, RpcClient, RpcErrorObject, RpcResponse, TrustAnchor,
};

#[cfg(feature = "core-api")]
pub use core_api::{CoreApiClient, LastBlockHeightRequest, LastBlockHeightResponse};
