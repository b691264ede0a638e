//! Integration tests for the RPC client against a mock tendermint node.

use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;
use tendermint_peers_client::{ClientError, PeerDescriptor, RpcClient, TrustAnchor};

fn client() -> RpcClient {
    RpcClient::new(Duration::from_secs(5)).expect("Failed to build RPC client")
}

#[tokio::test]
async fn test_net_info_yields_every_peer() {
    let server = MockServer::start_async().await;
    let peers: Vec<_> = (1..=5)
        .map(|i| {
            json!({
                "node_info": {"id": format!("node{i}"), "network": "net-x", "moniker": "m"},
                "is_outbound": i % 2 == 0,
                "remote_ip": format!("10.0.0.{i}")
            })
        })
        .collect();
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/net_info");
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": -1,
                "result": {"listening": true, "n_peers": "5", "peers": peers}
            }));
        })
        .await;

    let result = client().net_info(&server.base_url()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(result.len(), 5);
    for (i, peer) in result.iter().enumerate() {
        let n = i + 1;
        assert_eq!(
            peer,
            &PeerDescriptor::new(format!("10.0.0.{n}"), format!("node{n}"), "net-x")
        );
    }
}

#[tokio::test]
async fn test_net_info_zero_peers_is_success() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/net_info");
            then.status(200)
                .json_body(json!({"jsonrpc": "2.0", "id": -1, "result": {"n_peers": "0", "peers": null}}));
        })
        .await;

    let result = client().net_info(&server.base_url()).await;

    assert!(matches!(result, Ok(peers) if peers.is_empty()));
}

#[tokio::test]
async fn test_net_info_trailing_slash_in_base() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/net_info");
            then.status(200).json_body(json!({"result": {"peers": []}}));
        })
        .await;

    let base = format!("{}/", server.base_url());
    assert!(client().net_info(&base).await.is_ok());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_net_info_malformed_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/net_info");
            then.status(200).body("<html>not json</html>");
        })
        .await;

    let result = client().net_info(&server.base_url()).await;

    assert!(matches!(result, Err(ClientError::Decode(_))));
}

#[tokio::test]
async fn test_net_info_error_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/net_info");
            then.status(503);
        })
        .await;

    let result = client().net_info(&server.base_url()).await;

    assert!(matches!(result, Err(ClientError::Status(503))));
}

#[tokio::test]
async fn test_net_info_timeout() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/net_info");
            then.status(200)
                .delay(Duration::from_secs(2))
                .json_body(json!({"result": {"peers": []}}));
        })
        .await;

    let client = RpcClient::new(Duration::from_millis(200)).unwrap();
    let result = client.net_info(&server.base_url()).await;

    assert!(matches!(result, Err(ClientError::Timeout)));
}

#[tokio::test]
async fn test_net_info_unreachable() {
    let result = client().net_info("http://127.0.0.1:1").await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_latest_block() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/block");
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": -1,
                "result": {
                    "block_id": {"hash": "ABCD"},
                    "block": {"header": {"height": "100"}}
                }
            }));
        })
        .await;

    let anchor = client().latest_block(&server.base_url()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(
        anchor,
        TrustAnchor {
            height: 100,
            hash: "ABCD".to_string()
        }
    );
}

#[tokio::test]
async fn test_latest_block_without_result() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/block");
            then.status(200).json_body(json!({"jsonrpc": "2.0", "id": -1}));
        })
        .await;

    let result = client().latest_block(&server.base_url()).await;

    assert!(matches!(result, Err(ClientError::MissingField("result"))));
}
