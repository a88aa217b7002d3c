//! The immutable wire request and per-call transport options.

use bytes::Bytes;
use http::{HeaderMap, Method};
use std::fmt;
use std::time::Duration;

/// A finalized HTTP request, produced once per call by resolving a
/// `RequestTemplate` against a target. Never mutated after construction;
/// consumed by the transport and referenced by error and logging paths.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Option<Bytes>,
    charset: &'static str,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        url: String,
        headers: HeaderMap,
        body: Option<Bytes>,
        charset: &'static str,
    ) -> Self {
        Self {
            method,
            url,
            headers,
            body,
            charset,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The absolute URL this request targets.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Ordered, multi-valued request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Charset of the body when it is text.
    pub fn charset(&self) -> &'static str {
        self.charset
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {} HTTP/1.1", self.method, self.url)?;
        for (name, value) in &self.headers {
            writeln!(f, "{}: {}", name, value.to_str().unwrap_or("<binary>"))?;
        }
        if let Some(body) = &self.body {
            writeln!(f)?;
            write!(f, "{}", String::from_utf8_lossy(body))?;
        }
        Ok(())
    }
}

/// Transport knobs passed through to the dispatch call unchanged.
#[derive(Debug, Clone)]
pub struct Options {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub follow_redirects: bool,
}

impl Options {
    pub fn new(connect_timeout: Duration, read_timeout: Duration, follow_redirects: bool) -> Self {
        Self {
            connect_timeout,
            read_timeout,
            follow_redirects,
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
            follow_redirects: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_shows_request_line_and_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("accept", "application/json".parse().unwrap());
        let request = Request::new(
            Method::GET,
            "https://api.example.com/users".to_string(),
            headers,
            None,
            "utf-8",
        );
        let rendered = request.to_string();
        assert!(rendered.starts_with("GET https://api.example.com/users HTTP/1.1"));
        assert!(rendered.contains("accept: application/json"));
    }

    #[test]
    fn default_options() {
        let options = Options::default();
        assert_eq!(options.connect_timeout, Duration::from_secs(10));
        assert_eq!(options.read_timeout, Duration::from_secs(60));
        assert!(options.follow_redirects);
    }
}
