//! Request and response-event types for the transport seam

use std::fmt;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode, Url};
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::stream_reader::StreamReader;

/// An outgoing request handed to a [`crate::Transport`].
///
/// The URL is absolute; callers join service paths against their base URL
/// before constructing one of these. The bearer authorization header is
/// part of `headers`; the content type travels with the payload.
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Payload,
}

impl TransportRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Payload::Empty,
        }
    }
}

impl fmt::Debug for TransportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

/// Request body: nothing, in-memory bytes, or a chunked streaming source.
///
/// The plain-vs-stream choice is made when the request is constructed;
/// it is not a runtime state of the exchange.
pub enum Payload {
    Empty,
    Bytes { content_type: String, data: Bytes },
    Stream { content_type: String, reader: StreamReader },
}

impl Payload {
    /// Content type to send with the body, if there is a body.
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Payload::Empty => None,
            Payload::Bytes { content_type, .. } | Payload::Stream { content_type, .. } => {
                Some(content_type)
            }
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Empty => write!(f, "Empty"),
            Payload::Bytes { content_type, data } => f
                .debug_struct("Bytes")
                .field("content_type", content_type)
                .field("len", &data.len())
                .finish(),
            Payload::Stream { content_type, .. } => f
                .debug_struct("Stream")
                .field("content_type", content_type)
                .finish_non_exhaustive(),
        }
    }
}

/// One event in a transport exchange, delivered in wire order:
/// headers first, then zero or more chunks, then exactly one of
/// `Completed` or `Failed`.
#[derive(Debug)]
pub enum ResponseEvent {
    Headers { status: StatusCode, headers: HeaderMap },
    Chunk(Bytes),
    Completed,
    Failed(TransportError),
}

/// Receiving side of an in-flight exchange.
///
/// Events arrive in the order the transport produced them. `abort`
/// cancels the underlying exchange; the abort hook fires at most once no
/// matter how often it is called.
pub struct ResponseStream {
    events: mpsc::Receiver<ResponseEvent>,
    abort: Option<Box<dyn FnOnce() + Send>>,
}

impl ResponseStream {
    pub fn new(events: mpsc::Receiver<ResponseEvent>, abort: Box<dyn FnOnce() + Send>) -> Self {
        Self {
            events,
            abort: Some(abort),
        }
    }

    /// Next event in the exchange. A transport that drops its sender
    /// without a terminal event surfaces as `Failed(Interrupted)`.
    pub async fn next_event(&mut self) -> ResponseEvent {
        match self.events.recv().await {
            Some(event) => event,
            None => ResponseEvent::Failed(TransportError::Interrupted),
        }
    }

    /// Cancel the in-flight exchange. Idempotent.
    pub fn abort(&mut self) {
        if let Some(abort) = self.abort.take() {
            abort();
        }
    }
}

impl fmt::Debug for ResponseStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseStream")
            .field("abortable", &self.abort.is_some())
            .finish_non_exhaustive()
    }
}
