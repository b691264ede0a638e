//! Reachability check of a node's peer-to-peer listener.

use crate::error::ClientError;
use log::debug;
use std::time::Duration;
use tokio::net::TcpStream;

/// Open a TCP connection to `address` and close it again.
///
/// Only reachability is validated, no p2p handshake is attempted.
///
/// # Arguments
///
/// * `address` - Socket address of the listener, e.g. `1.2.3.4:26656`.
/// * `timeout` - Maximum time to wait for the connection to be established.
///
/// # Returns
///
/// * `Ok(())` - The listener accepted the connection.
/// * `Err(ClientError)` - The connection was refused, failed or timed out.
pub async fn dial(address: &str, timeout: Duration) -> Result<(), ClientError> {
    let stream = tokio::time::timeout(timeout, TcpStream::connect(address)).await??;
    debug!("Dialed peer listener at {address}");
    drop(stream);
    Ok(())
}
