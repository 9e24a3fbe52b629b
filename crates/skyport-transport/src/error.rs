//! Error types for transport exchanges

/// Errors from a transport exchange.
///
/// `Stream` is a failure reading the local request body; `Body` is a
/// failure reading the remote response body. The distinction matters to
/// callers: the former is the caller's data source misbehaving, the latter
/// is the network or the service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("request body stream failed: {0}")]
    Stream(String),

    #[error("response body read failed: {0}")]
    Body(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("exchange ended before completion")]
    Interrupted,
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
