//! Probe of the vega core gRPC API.
//!
//! The request and response messages are declared by hand instead of being
//! generated from the vega protobufs, the probe only needs the one call.

use crate::error::ClientError;
use log::debug;
use std::time::Duration;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Endpoint;

const LAST_BLOCK_HEIGHT_PATH: &str = "/vega.api.v1.CoreService/LastBlockHeight";

/// `vega.api.v1.LastBlockHeightRequest`
#[derive(Clone, PartialEq, prost::Message)]
pub struct LastBlockHeightRequest {}

/// `vega.api.v1.LastBlockHeightResponse`, trailing fields are skipped.
#[derive(Clone, PartialEq, prost::Message)]
pub struct LastBlockHeightResponse {
    #[prost(uint64, tag = "1")]
    pub height: u64,
    #[prost(string, tag = "2")]
    pub hash: String,
}

/// Client for a node's core API.
#[derive(Debug, Clone)]
pub struct CoreApiClient {
    timeout: Duration,
}

impl CoreApiClient {
    /// Create a client bounding both connection and call by `timeout`.
    pub fn new(timeout: Duration) -> Self {
        CoreApiClient { timeout }
    }

    /// Ask the node at `address` for its last block height.
    ///
    /// # Arguments
    ///
    /// * `address` - Socket address of the core API, e.g. `1.2.3.4:3002`.
    ///
    /// # Returns
    ///
    /// * `Ok(u64)` - The height of the last block the node committed.
    /// * `Err(ClientError)` - On connection failure, non-OK status or deadline.
    pub async fn last_block_height(&self, address: &str) -> Result<u64, ClientError> {
        tokio::time::timeout(self.timeout, self.call_last_block_height(address)).await?
    }

    async fn call_last_block_height(&self, address: &str) -> Result<u64, ClientError> {
        let channel = Endpoint::from_shared(format!("http://{address}"))?
            .connect_timeout(self.timeout)
            .timeout(self.timeout)
            .connect()
            .await?;

        let mut grpc = tonic::client::Grpc::new(channel);
        grpc.ready().await?;

        let mut request = tonic::Request::new(LastBlockHeightRequest {});
        request.set_timeout(self.timeout);

        let codec: ProstCodec<LastBlockHeightRequest, LastBlockHeightResponse> =
            ProstCodec::default();
        let response = grpc
            .unary(
                request,
                PathAndQuery::from_static(LAST_BLOCK_HEIGHT_PATH),
                codec,
            )
            .await?
            .into_inner();

        debug!(
            "Core API at {address} is at height {} ({})",
            response.height, response.hash
        );
        Ok(response.height)
    }
}
