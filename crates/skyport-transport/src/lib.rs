//! Transport seam for the Skyport client
//!
//! Everything that touches the network goes through the [`Transport`] trait:
//! the operation engine sends resource requests through it, and the
//! authorization flow sends its token-endpoint request through the same
//! seam. This keeps both state machines testable against scripted
//! transports while [`HttpTransport`] provides the real reqwest-backed
//! implementation.
//!
//! A transport exchange is event-shaped: `send` resolves to a
//! [`ResponseStream`], which yields headers, body chunks, and a terminal
//! completed/failed event in order, and can be aborted while in flight.
//! Request bodies are either in-memory bytes or a [`StreamReader`] that
//! feeds the body in bounded chunks.

pub mod error;
pub mod http;
pub mod request;
pub mod stream_reader;

pub use error::{Result, TransportError};
pub use http::HttpTransport;
pub use request::{Payload, ResponseEvent, ResponseStream, TransportRequest};
pub use stream_reader::StreamReader;

use std::future::Future;
use std::pin::Pin;

/// Abstraction over the HTTP layer that performs byte-level I/O.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn Transport>`).
pub trait Transport: Send + Sync {
    /// Submit a request. Resolves once the exchange is underway; response
    /// headers, body chunks, and the terminal outcome arrive as events on
    /// the returned stream.
    fn send(
        &self,
        request: TransportRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ResponseStream>> + Send + '_>>;
}
