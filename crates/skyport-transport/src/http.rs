//! reqwest-backed transport implementation
//!
//! Forwards each exchange as events on an mpsc channel: the request is
//! driven by a spawned task so the caller can consume response chunks and
//! abort independently of the request/response lifecycle. Streamed request
//! bodies are wrapped so the source is read chunk-by-chunk as the
//! connection accepts bytes.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::request::{Payload, ResponseEvent, ResponseStream, TransportRequest};
use crate::Transport;

/// Events buffered per exchange before the producer task backpressures.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Transport over a shared `reqwest::Client`.
///
/// Timeouts are configured at the client level and surface to consumers
/// as `Connect` failures on the event stream.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(format!("building http client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client (connection pool reuse across components).
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        request: TransportRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ResponseStream>> + Send + '_>> {
        let client = self.client.clone();
        Box::pin(async move {
            let mut builder = client
                .request(request.method.clone(), request.url.clone())
                .headers(request.headers);

            if let Some(content_type) = request.body.content_type() {
                let value = HeaderValue::from_str(content_type).map_err(|e| {
                    TransportError::InvalidRequest(format!("content type {content_type:?}: {e}"))
                })?;
                builder = builder.header(CONTENT_TYPE, value);
            }
            builder = match request.body {
                Payload::Empty => builder,
                Payload::Bytes { data, .. } => builder.body(data),
                Payload::Stream { reader, .. } => builder.body(reqwest::Body::wrap_stream(reader)),
            };

            debug!(method = %request.method, url = %request.url, "submitting request");

            let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
            let task = tokio::spawn(forward_exchange(builder, tx));
            Ok(ResponseStream::new(rx, Box::new(move || task.abort())))
        })
    }
}

/// Drive one request/response exchange, forwarding everything that happens
/// as events. Send errors on the channel mean the consumer is gone; the
/// exchange stops quietly.
async fn forward_exchange(builder: reqwest::RequestBuilder, tx: mpsc::Sender<ResponseEvent>) {
    let response = match builder.send().await {
        Ok(response) => response,
        Err(e) => {
            let _ = tx.send(ResponseEvent::Failed(classify_send_error(e))).await;
            return;
        }
    };

    let status = response.status();
    let headers = response.headers().clone();
    if tx
        .send(ResponseEvent::Headers { status, headers })
        .await
        .is_err()
    {
        return;
    }

    let mut body = response.bytes_stream();
    while let Some(next) = body.next().await {
        match next {
            Ok(chunk) => {
                if tx.send(ResponseEvent::Chunk(chunk)).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                let _ = tx
                    .send(ResponseEvent::Failed(TransportError::Body(e.to_string())))
                    .await;
                return;
            }
        }
    }
    let _ = tx.send(ResponseEvent::Completed).await;
}

/// Map a reqwest send error onto the transport error kinds. Body errors
/// at send time are failures reading the caller's upload stream.
fn classify_send_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() || e.is_connect() {
        TransportError::Connect(e.to_string())
    } else if e.is_body() {
        TransportError::Stream(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}
