//! Error types for node probes.

use std::error::Error;
use std::fmt;
use std::io;

/// Errors that can occur while probing a node over one of its protocols.
///
/// Every variant is terminal for the probe that raised it, callers record the
/// probe as failed and move on.
#[derive(Debug)]
pub enum ClientError {
    /// The HTTP request failed before a response was received.
    Http(reqwest::Error),
    /// The node answered with a non-success HTTP status code.
    Status(u16),
    /// The response body was not valid JSON for the expected envelope.
    Decode(serde_json::Error),
    /// The node answered with a JSON-RPC error object.
    Rpc { code: i64, message: String },
    /// A field required by the caller was absent from the response.
    MissingField(&'static str),
    /// The block height was not a decimal integer.
    InvalidHeight(String),
    /// An I/O error occurred during network operations.
    Io(io::Error),
    /// The operation did not finish before its deadline.
    Timeout,
    /// The gRPC channel to the core API could not be established.
    #[cfg(feature = "core-api")]
    Transport(tonic::transport::Error),
    /// The core API answered the call with a non-OK status.
    #[cfg(feature = "core-api")]
    Grpc(tonic::Status),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Http(err) => write!(f, "HTTP request failed: {err}"),
            ClientError::Status(code) => write!(f, "Node responded with HTTP status {code}"),
            ClientError::Decode(err) => write!(f, "Failed to decode response body: {err}"),
            ClientError::Rpc { code, message } => {
                write!(f, "Node returned JSON-RPC error {code}: {message}")
            }
            ClientError::MissingField(field) => write!(f, "Response is missing `{field}`"),
            ClientError::InvalidHeight(height) => write!(f, "Invalid block height: {height:?}"),
            ClientError::Io(err) => write!(f, "Connection error: {err}"),
            ClientError::Timeout => write!(f, "Operation timed out"),
            #[cfg(feature = "core-api")]
            ClientError::Transport(err) => write!(f, "gRPC transport failed: {err}"),
            #[cfg(feature = "core-api")]
            ClientError::Grpc(status) => write!(f, "gRPC call failed: {status}"),
        }
    }
}

impl Error for ClientError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ClientError::Http(err) => Some(err),
            ClientError::Decode(err) => Some(err),
            ClientError::Io(err) => Some(err),
            ClientError::Status(_) => None,
            ClientError::Rpc { .. } => None,
            ClientError::MissingField(_) => None,
            ClientError::InvalidHeight(_) => None,
            ClientError::Timeout => None,
            #[cfg(feature = "core-api")]
            ClientError::Transport(err) => Some(err),
            #[cfg(feature = "core-api")]
            ClientError::Grpc(status) => Some(status),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Http(err)
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err)
    }
}

impl From<io::Error> for ClientError {
    fn from(err: io::Error) -> Self {
        ClientError::Io(err)
    }
}

impl From<tokio::time::error::Elapsed> for ClientError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        ClientError::Timeout
    }
}

#[cfg(feature = "core-api")]
impl From<tonic::transport::Error> for ClientError {
    fn from(err: tonic::transport::Error) -> Self {
        ClientError::Transport(err)
    }
}

#[cfg(feature = "core-api")]
impl From<tonic::Status> for ClientError {
    fn from(status: tonic::Status) -> Self {
        ClientError::Grpc(status)
    }
}
