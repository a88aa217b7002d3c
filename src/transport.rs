//! The pluggable transport that actually moves bytes.

use crate::error::{Error, Result};
use crate::request::{Options, Request};
use crate::response::{Body, Response};
use async_trait::async_trait;
use futures::StreamExt;
use std::io;

/// Dispatches a finalized [`Request`] and produces a [`Response`].
///
/// Implementations must raise on I/O failure before a response is obtainable
/// and must be safe for concurrent use; the runtime funnels every invocation
/// of every method through one shared instance.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: Request, options: &Options) -> Result<Response>;
}

/// The default transport, backed by a pooled [`reqwest::Client`].
///
/// `connect_timeout` and `follow_redirects` are applied when the client is
/// constructed (reqwest models them per-client); `read_timeout` bounds each
/// dispatched request.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(options: &Options) -> Result<Self> {
        let redirects = if options.follow_redirects {
            reqwest::redirect::Policy::default()
        } else {
            reqwest::redirect::Policy::none()
        };
        let client = reqwest::Client::builder()
            .connect_timeout(options.connect_timeout)
            .redirect(redirects)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP transport: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: Request, options: &Options) -> Result<Response> {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url())
            .timeout(options.read_timeout)
            .headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::transport_failure(&request, e.to_string()))?;

        let status = response.status();
        let reason = status.canonical_reason().map(str::to_string);
        let headers = response.headers().clone();
        let length = response.content_length();
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(io::Error::other))
            .boxed();

        Ok(Response::new(
            status,
            reason,
            headers,
            Body::stream(stream, length),
            request,
        ))
    }
}
