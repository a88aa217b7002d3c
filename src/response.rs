//! The immutable response shell and its consumable body.
//!
//! A [`Response`] is created by the transport. Its metadata (status, reason,
//! headers) is immutable; the body is read at most once unless it is
//! re-buffered into memory with [`Response::buffer`]. Dropping a response
//! releases any underlying network resource.

use crate::error::{Error, Result};
use crate::request::Request;
use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::StreamExt;
use http::{HeaderMap, StatusCode};
use std::fmt;
use std::io;

/// A lazily-streamable response body of bounded or unbounded known length.
pub enum Body {
    /// No body was returned.
    Empty,
    /// The body is fully held in memory.
    Buffered(Bytes),
    /// The body has not been read off the wire yet.
    Stream {
        stream: BoxStream<'static, io::Result<Bytes>>,
        /// Content length, when the transport knows it.
        length: Option<u64>,
    },
}

impl Body {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        if bytes.is_empty() {
            Body::Empty
        } else {
            Body::Buffered(bytes)
        }
    }

    pub fn stream(stream: BoxStream<'static, io::Result<Bytes>>, length: Option<u64>) -> Self {
        Body::Stream { stream, length }
    }

    /// Known length in bytes, when available.
    pub fn length(&self) -> Option<u64> {
        match self {
            Body::Empty => Some(0),
            Body::Buffered(bytes) => Some(bytes.len() as u64),
            Body::Stream { length, .. } => *length,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self, Body::Empty | Body::Buffered(_))
    }

    /// Consumes the body into memory. Streams are drained; this is the one
    /// read the body supports.
    pub async fn into_bytes(self) -> io::Result<Bytes> {
        match self {
            Body::Empty => Ok(Bytes::new()),
            Body::Buffered(bytes) => Ok(bytes),
            Body::Stream { mut stream, length } => {
                let mut buf = BytesMut::with_capacity(length.unwrap_or(0).min(65_536) as usize);
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => write!(f, "Body::Empty"),
            Body::Buffered(bytes) => write!(f, "Body::Buffered({} bytes)", bytes.len()),
            Body::Stream { length, .. } => write!(f, "Body::Stream(length={length:?})"),
        }
    }
}

/// An immutable response to an HTTP invocation.
///
/// Keeps a back-reference to the originating [`Request`] so error and logging
/// paths can report the method and URL without extra bookkeeping.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    reason: Option<String>,
    headers: HeaderMap,
    body: Body,
    request: Request,
}

impl Response {
    pub fn new(
        status: StatusCode,
        reason: Option<String>,
        headers: HeaderMap,
        body: Body,
        request: Request,
    ) -> Self {
        Self {
            status,
            reason,
            headers,
            body,
            request,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The reason phrase, when the transport reported one.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Response headers, case-insensitively keyed.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A single header value as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn into_body(self) -> Body {
        self.body
    }

    /// The request that produced this response.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Reads the body fully into memory, releasing the network resource.
    /// A read failure surfaces as [`Error::Read`].
    pub async fn buffer(self) -> Result<Response> {
        let Response {
            status,
            reason,
            headers,
            body,
            request,
        } = self;
        let bytes = body.into_bytes().await.map_err(|e| {
            Error::read_failure(
                request.method().clone(),
                request.url(),
                Some(status.as_u16()),
                e.to_string(),
            )
        })?;
        Ok(Response {
            status,
            reason,
            headers,
            body: Body::from_bytes(bytes),
            request,
        })
    }

    /// Like [`Response::buffer`], but a read failure is swallowed and the
    /// response comes back with an empty body. Used when capturing body bytes
    /// for error context, where the classified error matters more than the
    /// capture.
    pub async fn buffer_best_effort(self) -> Response {
        let Response {
            status,
            reason,
            headers,
            body,
            request,
        } = self;
        let bytes = body.into_bytes().await.unwrap_or_default();
        Response {
            status,
            reason,
            headers,
            body: Body::from_bytes(bytes),
            request,
        }
    }

    /// The buffered body bytes. Empty for streaming bodies; call
    /// [`Response::buffer`] first.
    pub fn body_bytes(&self) -> Bytes {
        match &self.body {
            Body::Buffered(bytes) => bytes.clone(),
            _ => Bytes::new(),
        }
    }
}
