//! Error types for the invocation pipeline.
//!
//! Errors preserve maximum debugging information while staying ergonomic to
//! match on: every per-call error carries the HTTP method and URL (or the
//! method's configuration key), the status when one exists, and a best-effort
//! capture of the raw response bytes.

use crate::request::Request;
use crate::response::Response;
use bytes::Bytes;
use http::{HeaderMap, Method};
use std::time::{Duration, SystemTime};

/// The main error type for compiled-API invocations.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// The API description failed structural validation at compile time.
    #[error("contract error: {0}")]
    Contract(String),

    /// Invalid client or request configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// An invalid URL was provided.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The request body could not be serialized.
    #[error("failed to encode request: {0}")]
    Encode(String),

    /// A transient failure eligible for the retry policy: the transport
    /// failed before a response was obtainable, or the server signalled an
    /// explicit retry-after.
    #[error("{message}")]
    Retryable {
        method: Method,
        url: String,
        message: String,
        /// Server-provided hint for how long to wait before retrying.
        retry_after: Option<Duration>,
        /// The classified error that triggered the retry, when one exists.
        cause: Option<Box<Error>>,
    },

    /// I/O failure while consuming a response body. Never retried: the
    /// request may already have had side effects.
    #[error("{message} reading {method} {url}")]
    Read {
        method: Method,
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("failed to decode response (status {status}): {message}")]
    Decode {
        status: u16,
        message: String,
        body: Bytes,
    },

    /// The server returned an error status, classified by [`StatusKind`].
    #[error("{message}")]
    Status {
        kind: StatusKind,
        status: u16,
        message: String,
        /// Raw response bytes, captured best-effort (empty on read failure).
        body: Bytes,
    },
}

impl Error {
    /// Wraps a transport-level I/O failure as a retryable error. Carries no
    /// status and no retry-after hint.
    pub fn transport_failure(request: &Request, message: impl AsRef<str>) -> Self {
        Error::Retryable {
            method: request.method().clone(),
            url: request.url().to_string(),
            message: format!(
                "{} executing {} {}",
                message.as_ref(),
                request.method(),
                request.url()
            ),
            retry_after: None,
            cause: None,
        }
    }

    /// An I/O failure while reading a response body.
    pub fn read_failure(
        method: Method,
        url: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Error::Read {
            method,
            url: url.into(),
            status,
            message: message.into(),
        }
    }

    /// Classifies an error status into the fixed status-to-kind taxonomy.
    pub fn status_error(config_key: &str, status: u16, body: Bytes) -> Self {
        Error::Status {
            kind: StatusKind::classify(status),
            status,
            message: format!("status {status} reading {config_key}"),
            body,
        }
    }

    /// True if the retry policy applies to this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Retryable { .. })
    }

    /// The HTTP status code, when this error has one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } | Error::Decode { status, .. } => Some(*status),
            Error::Read { status, .. } => *status,
            Error::Retryable { cause, .. } => cause.as_ref().and_then(|c| c.status()),
            _ => None,
        }
    }

    /// The classified status kind, when this error has one.
    pub fn kind(&self) -> Option<StatusKind> {
        match self {
            Error::Status { kind, .. } => Some(*kind),
            Error::Retryable { cause, .. } => cause.as_ref().and_then(|c| c.kind()),
            _ => None,
        }
    }

    /// Raw response bytes captured with the error, when any.
    pub fn body(&self) -> Option<&Bytes> {
        match self {
            Error::Status { body, .. } | Error::Decode { body, .. } => Some(body),
            Error::Retryable { cause, .. } => cause.as_ref().and_then(|c| c.body()),
            _ => None,
        }
    }

    /// The captured response body as UTF-8 text, empty when absent.
    pub fn body_text(&self) -> String {
        self.body()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default()
    }

    /// The server's retry-after hint, when one was attached.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::Retryable { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Fixed mapping from HTTP status codes to error kinds. Statuses outside the
/// table classify as [`StatusKind::Other`], preserving the raw status on the
/// error itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    NotAcceptable,
    Conflict,
    Gone,
    UnsupportedMediaType,
    UnprocessableEntity,
    TooManyRequests,
    InternalServerError,
    NotImplemented,
    BadGateway,
    ServiceUnavailable,
    GatewayTimeout,
    Other,
}

impl StatusKind {
    pub fn classify(status: u16) -> Self {
        match status {
            400 => StatusKind::BadRequest,
            401 => StatusKind::Unauthorized,
            403 => StatusKind::Forbidden,
            404 => StatusKind::NotFound,
            405 => StatusKind::MethodNotAllowed,
            406 => StatusKind::NotAcceptable,
            409 => StatusKind::Conflict,
            410 => StatusKind::Gone,
            415 => StatusKind::UnsupportedMediaType,
            422 => StatusKind::UnprocessableEntity,
            429 => StatusKind::TooManyRequests,
            500 => StatusKind::InternalServerError,
            501 => StatusKind::NotImplemented,
            502 => StatusKind::BadGateway,
            503 => StatusKind::ServiceUnavailable,
            504 => StatusKind::GatewayTimeout,
            _ => StatusKind::Other,
        }
    }
}

/// Turns an error response into a classified [`Error`]. Invoked by the
/// pipeline for every non-success status it does not decode.
pub trait ErrorDecoder: Send + Sync {
    /// `body` is the response body, buffered best-effort (empty when reading
    /// it failed).
    fn decode(&self, config_key: &str, response: &Response, body: Bytes) -> Error;
}

/// Default classification: status-keyed kinds, with `Retry-After`-bearing
/// responses wrapped as retryable so the retry policy can honor the hint.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorDecoder;

impl ErrorDecoder for DefaultErrorDecoder {
    fn decode(&self, config_key: &str, response: &Response, body: Bytes) -> Error {
        let status = response.status().as_u16();
        let classified = Error::status_error(config_key, status, body);
        match parse_retry_after(response.headers()) {
            Some(delay) => Error::Retryable {
                method: response.request().method().clone(),
                url: response.request().url().to_string(),
                message: classified.to_string(),
                retry_after: Some(delay),
                cause: Some(Box::new(classified)),
            },
            None => classified,
        }
    }
}

/// Parses the `Retry-After` header. Supports both delta-seconds and HTTP-date
/// forms; a date already in the past yields a zero delay.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = headers.get(http::header::RETRY_AFTER)?.to_str().ok()?;

    if let Ok(seconds) = header.trim().parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    if let Ok(date_time) = httpdate::parse_http_date(header) {
        return Some(
            date_time
                .duration_since(SystemTime::now())
                .unwrap_or(Duration::ZERO),
        );
    }

    None
}
