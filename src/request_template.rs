//! The mutable, per-method request builder.
//!
//! A [`RequestTemplate`] skeleton is built once per method at contract
//! compile time, then cloned for every call: the clone is resolved against
//! the call's arguments, mutated by interceptors and by the target, and
//! finally converted into an immutable [`Request`]. The skeleton itself is
//! never mutated after compilation.

use crate::error::{Error, Result};
use crate::request::Request;
use crate::template::{
    encode_query_component, BodyTemplate, CollectionFormat, Template, Variables,
};
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};

const UTF_8: &str = "utf-8";

#[derive(Debug, Clone, Default)]
enum BodyState {
    #[default]
    None,
    /// A fixed byte body (raw literal, encoder output, or a resolved
    /// template).
    Literal(Bytes),
    /// A body template awaiting resolution.
    Template(BodyTemplate),
}

/// Mutable, partially-resolved representation of an HTTP request.
///
/// Headers and query parameters are ordered multimaps: values are sequences,
/// not sets, because duplicates and ordering matter on the wire. Header name
/// matching is case-insensitive; values submitted under differing cases of
/// one name concatenate in submission order.
#[derive(Debug, Clone, Default)]
pub struct RequestTemplate {
    method: Option<Method>,
    target: Option<String>,
    uri: Option<String>,
    queries: Vec<(String, Vec<String>)>,
    headers: Vec<(String, Vec<String>)>,
    body: BodyState,
    decode_slash: bool,
    collection_format: CollectionFormat,
    resolved: bool,
}

impl RequestTemplate {
    pub fn new() -> Self {
        Self {
            decode_slash: true,
            ..Default::default()
        }
    }

    /// Sets the HTTP method.
    pub fn method(&mut self, method: Method) -> &mut Self {
        self.method = Some(method);
        self
    }

    pub fn method_ref(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    /// Sets the URI. A query string, when present, is split off and folded
    /// into the ordered query map. The URI may be absolute.
    pub fn uri(&mut self, uri: impl AsRef<str>) -> &mut Self {
        let uri = uri.as_ref();
        match uri.split_once('?') {
            Some((path, query)) => {
                self.uri = Some(path.to_string());
                for pair in query.split('&').filter(|p| !p.is_empty()) {
                    match pair.split_once('=') {
                        Some((name, value)) => self.query(name, value),
                        None => self.query(pair, ""),
                    };
                }
            }
            None => self.uri = Some(uri.to_string()),
        }
        self
    }

    pub fn uri_ref(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// Sets the base URL prefixed to a relative URI when the request is
    /// finalized. A trailing slash is trimmed so `target + uri` composes.
    pub fn target(&mut self, base: impl AsRef<str>) -> &mut Self {
        self.target = Some(base.as_ref().trim_end_matches('/').to_string());
        self
    }

    pub fn target_ref(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// True once the template points at an absolute URL, either through a
    /// target or an absolute URI.
    pub fn has_absolute_url(&self) -> bool {
        self.target.is_some() || self.uri.as_deref().is_some_and(|u| u.starts_with("http"))
    }

    /// The URL as currently known: target plus URI.
    pub fn url(&self) -> String {
        let uri = self.uri.as_deref().unwrap_or("");
        match &self.target {
            Some(target) if !uri.starts_with("http") => format!("{target}{uri}"),
            _ => uri.to_string(),
        }
    }

    /// Appends a query parameter value. Values may contain `{placeholders}`.
    pub fn query(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> &mut Self {
        let name = name.as_ref();
        match self.queries.iter_mut().find(|(n, _)| n == name) {
            Some((_, values)) => values.push(value.into()),
            None => self.queries.push((name.to_string(), vec![value.into()])),
        }
        self
    }

    /// Replaces all values of a query parameter.
    pub fn replace_query(&mut self, name: impl AsRef<str>, values: Vec<String>) -> &mut Self {
        let name = name.as_ref();
        self.queries.retain(|(n, _)| n != name);
        self.queries.push((name.to_string(), values));
        self
    }

    pub fn queries(&self) -> &[(String, Vec<String>)] {
        &self.queries
    }

    /// Replaces a header, dropping any previously-submitted values of the
    /// same (case-insensitive) name. Last write wins.
    pub fn header(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> &mut Self {
        let name = name.as_ref();
        self.headers
            .retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), vec![value.into()]));
        self
    }

    /// Appends a header value, keeping previously-submitted values. Values
    /// under differing cases of one name concatenate in submission order.
    pub fn append_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> &mut Self {
        let name = name.as_ref();
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, values)) => values.push(value.into()),
            None => self.headers.push((name.to_string(), vec![value.into()])),
        }
        self
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    pub fn headers(&self) -> &[(String, Vec<String>)] {
        &self.headers
    }

    /// Sets a fixed byte body.
    pub fn body_literal(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.body = BodyState::Literal(body.into());
        self
    }

    /// Sets a body template; unresolved placeholders survive expansion.
    pub fn body_template(&mut self, pattern: impl Into<String>) -> &mut Self {
        self.body = BodyState::Template(BodyTemplate::new(pattern.into()));
        self
    }

    pub fn body_bytes(&self) -> Option<&Bytes> {
        match &self.body {
            BodyState::Literal(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn has_body(&self) -> bool {
        !matches!(self.body, BodyState::None)
    }

    pub fn has_body_template(&self) -> bool {
        matches!(self.body, BodyState::Template(_))
    }

    pub(crate) fn set_decode_slash(&mut self, decode_slash: bool) -> &mut Self {
        self.decode_slash = decode_slash;
        self
    }

    pub(crate) fn set_collection_format(&mut self, format: CollectionFormat) -> &mut Self {
        self.collection_format = format;
        self
    }

    /// True if any template in this request (path, query values, header
    /// values, body) references the named variable.
    pub fn has_variable(&self, name: &str) -> bool {
        if let Some(uri) = &self.uri {
            if Template::uri(uri.clone()).has_variable(name) {
                return true;
            }
        }
        let in_values = |values: &[String]| {
            values
                .iter()
                .any(|v| Template::value(v.clone()).has_variable(name))
        };
        if self.queries.iter().any(|(_, values)| in_values(values)) {
            return true;
        }
        if self.headers.iter().any(|(_, values)| in_values(values)) {
            return true;
        }
        if let BodyState::Template(body) = &self.body {
            if body.has_variable(name) {
                return true;
            }
        }
        false
    }

    /// True once [`RequestTemplate::resolve`] has run.
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Expands every template in this request against `variables`, producing
    /// a resolved copy. The path expands strictly; query and header values
    /// expand leniently, and a pair whose value still references a missing
    /// variable is dropped from the output.
    pub fn resolve(&self, variables: &Variables) -> Result<RequestTemplate> {
        let mut resolved = self.clone();

        if let Some(uri) = &self.uri {
            let mut path = Template::uri(uri.clone()).expand(variables)?;
            if self.decode_slash {
                path = path.replace("%2F", "/").replace("%2f", "/");
            }
            resolved.uri = Some(path);
        }

        resolved.queries = self
            .queries
            .iter()
            .filter_map(|(name, values)| {
                let expanded: Vec<String> = values
                    .iter()
                    .filter_map(|value| expand_value(value, variables))
                    .collect();
                if expanded.is_empty() && !values.is_empty() {
                    None
                } else {
                    Some((name.clone(), expanded))
                }
            })
            .collect();

        resolved.headers = self
            .headers
            .iter()
            .filter_map(|(name, values)| {
                let expanded: Vec<String> = values
                    .iter()
                    .filter_map(|value| expand_header_value(value, variables))
                    .collect();
                if expanded.is_empty() {
                    None
                } else {
                    Some((name.clone(), expanded))
                }
            })
            .collect();

        if let BodyState::Template(body) = &self.body {
            resolved.body = BodyState::Literal(Bytes::from(body.expand(variables)));
        }

        resolved.resolved = true;
        Ok(resolved)
    }

    /// Finalizes this template into an immutable [`Request`].
    ///
    /// Requires a method, a resolved state, and an absolute URL; query names
    /// and values are percent-encoded on the way out, preserving sequences
    /// already encoded during resolution.
    pub fn request(&self) -> Result<Request> {
        let method = self
            .method
            .clone()
            .ok_or_else(|| Error::Config("request template has no HTTP method".to_string()))?;
        if !self.resolved {
            return Err(Error::Config(
                "request template has not been resolved".to_string(),
            ));
        }
        let mut url = self.url();
        if !url.starts_with("http") {
            return Err(Error::Config(format!(
                "request template has no absolute URL: `{url}`"
            )));
        }

        let query_string = self
            .queries
            .iter()
            .map(|(name, values)| {
                let name = encode_query_component(name);
                let values: Vec<String> =
                    values.iter().map(|v| encode_query_component(v)).collect();
                self.collection_format.render(&name, &values)
            })
            .collect::<Vec<_>>()
            .join("&");
        if !query_string.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&query_string);
        }

        let mut headers = HeaderMap::new();
        for (name, values) in &self.headers {
            let header_name = HeaderName::try_from(name.as_str())
                .map_err(|e| Error::Config(format!("invalid header name `{name}`: {e}")))?;
            for value in values {
                let header_value = HeaderValue::try_from(value.as_str())
                    .map_err(|e| Error::Config(format!("invalid header value for `{name}`: {e}")))?;
                headers.append(header_name.clone(), header_value);
            }
        }

        let body = match &self.body {
            BodyState::None => None,
            BodyState::Literal(bytes) => Some(bytes.clone()),
            BodyState::Template(_) => {
                return Err(Error::Config(
                    "request template body has not been resolved".to_string(),
                ));
            }
        };

        Ok(Request::new(method, url, headers, body, UTF_8))
    }
}

/// Expands one query value; `None` drops the value because a placeholder in
/// it stayed unresolved.
fn expand_value(value: &str, variables: &Variables) -> Option<String> {
    expand_or_drop(Template::value(value.to_string()), variables)
}

/// Header values expand without percent-encoding: headers are not URI
/// components.
fn expand_header_value(value: &str, variables: &Variables) -> Option<String> {
    expand_or_drop(
        Template::new(value.to_string(), crate::template::ExpansionMode::AllowUnresolved, false),
        variables,
    )
}

fn expand_or_drop(template: Template, variables: &Variables) -> Option<String> {
    if template
        .variables()
        .iter()
        .any(|name| !variables.contains_key(*name))
    {
        return None;
    }
    template.expand(variables).ok()
}
