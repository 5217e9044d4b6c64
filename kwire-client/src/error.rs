//! Client error types.

use std::io;
use std::time::Duration;

use kwire_protocol::{DecodeError, EncodeError};
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to a broker.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No socket is open.
    #[error("not connected to a broker")]
    NotConnected,

    /// Resolving or connecting to the broker failed.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Writing the request frame failed.
    #[error("failed to write request: {0}")]
    Write(#[source] io::Error),

    /// Reading the response frame failed.
    #[error("failed to read response: {0}")]
    Read(#[source] io::Error),

    /// The full response did not arrive in time.
    #[error("no complete response within {0:?}")]
    Timeout(Duration),

    /// The broker closed the socket mid-response.
    #[error("connection closed by broker")]
    ConnectionClosed,

    /// The response length prefix is negative, too short or over the limit.
    #[error("invalid response frame length: {0}")]
    InvalidFrameLength(i32),

    /// The response answers a different request.
    #[error("response correlation id {received} does not match request {expected}")]
    CorrelationMismatch { expected: i32, received: i32 },

    /// The request could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

impl ClientError {
    /// Whether the socket can no longer be trusted to be at a frame
    /// boundary. The connection closes itself on these.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Write(_)
                | ClientError::Read(_)
                | ClientError::Timeout(_)
                | ClientError::ConnectionClosed
                | ClientError::InvalidFrameLength(_)
                | ClientError::CorrelationMismatch { .. }
        )
    }
}
