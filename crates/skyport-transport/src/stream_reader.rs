//! Bounded-chunk reader for streamed upload bodies
//!
//! Wraps an async byte source and yields it as a sequence of fixed-size
//! chunks, so a large upload never has to sit in memory whole. The reader
//! is a single-consumer cursor: once the source reports end-of-stream or
//! a read fails, the reader yields nothing further.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::Stream;
use tokio::io::{AsyncRead, ReadBuf};

/// Chunked stream over an upload source.
///
/// Implements [`Stream`] with `io::Result<Bytes>` items, which is the
/// shape `reqwest::Body::wrap_stream` consumes. A failed read is sticky:
/// the error is yielded once and the stream then ends.
pub struct StreamReader {
    source: Box<dyn AsyncRead + Send + Unpin>,
    chunk_size: usize,
    finished: bool,
    failed: bool,
}

impl StreamReader {
    /// Default chunk size for upload bodies.
    pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

    pub fn new(source: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self::with_chunk_size(source, Self::DEFAULT_CHUNK_SIZE)
    }

    /// A zero `chunk_size` is clamped to 1 so the reader always makes
    /// progress.
    pub fn with_chunk_size(
        source: impl AsyncRead + Send + Unpin + 'static,
        chunk_size: usize,
    ) -> Self {
        Self {
            source: Box::new(source),
            chunk_size: chunk_size.max(1),
            finished: false,
            failed: false,
        }
    }

    /// Whether the source reported end-of-stream.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether a read has failed. A failed reader is not restartable.
    pub fn has_failed(&self) -> bool {
        self.failed
    }
}

impl Stream for StreamReader {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished || this.failed {
            return Poll::Ready(None);
        }

        let mut buf = vec![0u8; this.chunk_size];
        let mut read_buf = ReadBuf::new(&mut buf);
        match Pin::new(&mut this.source).poll_read(cx, &mut read_buf) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(())) => {
                let filled = read_buf.filled().len();
                if filled == 0 {
                    this.finished = true;
                    Poll::Ready(None)
                } else {
                    buf.truncate(filled);
                    Poll::Ready(Some(Ok(Bytes::from(buf))))
                }
            }
            Poll::Ready(Err(e)) => {
                this.failed = true;
                Poll::Ready(Some(Err(e)))
            }
        }
    }
}

impl fmt::Debug for StreamReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamReader")
            .field("chunk_size", &self.chunk_size)
            .field("finished", &self.finished)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::io::Cursor;

    /// Source that fails on its second read.
    struct FailingSource {
        reads: usize,
    }

    impl AsyncRead for FailingSource {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.reads == 0 {
                self.reads += 1;
                buf.put_slice(b"first");
                Poll::Ready(Ok(()))
            } else {
                Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "source died")))
            }
        }
    }

    #[tokio::test]
    async fn splits_the_source_into_bounded_chunks() {
        let mut reader = StreamReader::with_chunk_size(Cursor::new(vec![7u8; 10]), 4);
        let mut sizes = Vec::new();
        while let Some(chunk) = reader.next().await {
            sizes.push(chunk.unwrap().len());
        }
        assert_eq!(sizes, vec![4, 4, 2]);
        assert!(reader.is_finished());
        assert!(!reader.has_failed());
    }

    #[tokio::test]
    async fn empty_source_ends_immediately() {
        let mut reader = StreamReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(reader.next().await.is_none());
        assert!(reader.is_finished());
    }

    #[tokio::test]
    async fn read_failure_is_sticky() {
        let mut reader = StreamReader::with_chunk_size(FailingSource { reads: 0 }, 16);

        let first = reader.next().await.unwrap().unwrap();
        assert_eq!(first.as_ref(), b"first");

        let second = reader.next().await.unwrap();
        assert!(second.is_err());
        assert!(reader.has_failed());

        // Nothing further after a failure
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn zero_chunk_size_is_clamped() {
        let mut reader = StreamReader::with_chunk_size(Cursor::new(vec![1u8, 2]), 0);
        let chunk = reader.next().await.unwrap().unwrap();
        assert_eq!(chunk.len(), 1);
    }
}
