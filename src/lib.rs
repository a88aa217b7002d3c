//! # Courier - a declarative HTTP client runtime
//!
//! Courier turns an abstract description of an HTTP API into a reusable
//! client: the description is compiled once into validated call metadata,
//! and every invocation then runs through a pipeline that builds a concrete
//! request from templates, applies interceptors, dispatches over a pluggable
//! transport, retries transient failures with backoff, and decodes the
//! result or raises a classified error.
//!
//! ## Quick Start
//!
//! ```no_run
//! use courier::{ApiDescription, Courier, MethodDescription, Param};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), courier::Error> {
//!     // Describe the API once.
//!     let github = ApiDescription::new("GitHub")
//!         .header("Accept: application/vnd.github.v3+json")
//!         .method(
//!             MethodDescription::new("contributors", "GET /repos/{owner}/{repo}/contributors")
//!                 .param(Param::named("owner", "String"))
//!                 .param(Param::named("repo", "String")),
//!         );
//!
//!     // Compile it into a client.
//!     let client = Courier::builder()
//!         .target("https://api.github.com")?
//!         .build(&github)?;
//!
//!     // Invoke methods by name with positional arguments.
//!     let contributors: Vec<serde_json::Value> = client
//!         .call("contributors", vec![json!("openfeign"), json!("feign")])
//!         .await?;
//!     println!("{} contributors", contributors.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Compile-once contracts** - API descriptions are validated up front;
//!   malformed methods fail at construction, not mid-call
//! - **Template expansion** - `{name}` placeholders in paths, query values,
//!   headers, and bodies, with literal-preserving percent-encoding
//! - **Flexible retry logic** - stateful backoff policies cloned per call,
//!   honoring server `Retry-After` hints
//! - **Classified errors** - a fixed status-to-kind taxonomy that preserves
//!   raw response bytes for debugging
//! - **Pluggable seams** - transport, codecs, error classification,
//!   query-map flattening, interceptors, and targets are all traits
//! - **Automatic logging** - structured logging with `tracing` for
//!   observability
//!
//! ## Error Handling
//!
//! Every per-call error carries enough context to diagnose without
//! re-running: method and URL, the status when one exists, and a best-effort
//! capture of the response body.
//!
//! ```no_run
//! use courier::{Courier, Error, StatusKind};
//! # async fn example(client: Courier) {
//! match client.call::<serde_json::Value>("contributors", vec![]).await {
//!     Ok(value) => println!("ok: {value}"),
//!     Err(Error::Status { kind: StatusKind::NotFound, .. }) => {
//!         eprintln!("no such repository");
//!     }
//!     Err(e) => eprintln!("call failed: {e}"),
//! }
//! # }
//! ```

mod api;
mod client;
pub mod codec;
mod contract;
mod error;
pub mod interceptor;
mod metadata;
pub mod query_map;
mod request;
mod request_template;
mod response;
pub mod retry;
pub mod target;
pub mod template;
pub mod transport;

pub use api::{
    default_expander, ApiDescription, Expander, MethodDescription, Param, ParamBinding, ReturnKind,
};
pub use client::{Courier, CourierBuilder, PropagationPolicy};
pub use codec::{Decoder, Encoder, JsonDecoder, JsonEncoder, StringDecoder};
pub use contract::{Contract, DefaultContract};
pub use error::{DefaultErrorDecoder, Error, ErrorDecoder, Result, StatusKind};
pub use interceptor::{BasicAuthInterceptor, Interceptor};
pub use metadata::MethodMetadata;
pub use query_map::{FieldQueryMapEncoder, QueryMapEncoder};
pub use request::{Options, Request};
pub use request_template::RequestTemplate;
pub use response::{Body, Response};
pub use retry::{DefaultRetryer, NeverRetry, Retryer};
pub use target::{EmptyTarget, StaticTarget, Target};
pub use template::CollectionFormat;
pub use transport::{ReqwestTransport, Transport};
