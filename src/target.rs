//! Targets: the final relative-to-absolute URL resolution step.

use crate::error::{Error, Result};
use crate::request::Request;
use crate::request_template::RequestTemplate;
use url::Url;

/// Finalizes a resolved template into an immutable [`Request`], supplying
/// the base URL and any target-specific data.
pub trait Target: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// The base URL, when this target has one.
    fn url(&self) -> Option<&str>;

    fn apply(&self, template: &mut RequestTemplate) -> Result<Request>;
}

/// A target with a fixed base URL. Templates that already carry an absolute
/// URL (from a URL-override parameter) keep it.
#[derive(Debug, Clone)]
pub struct StaticTarget {
    name: String,
    url: String,
}

impl StaticTarget {
    pub fn new(url: impl AsRef<str>) -> Result<Self> {
        Self::named(url.as_ref(), url.as_ref())
    }

    pub fn named(name: impl Into<String>, url: impl AsRef<str>) -> Result<Self> {
        let url = url.as_ref();
        Url::parse(url)?;
        Ok(Self {
            name: name.into(),
            url: url.trim_end_matches('/').to_string(),
        })
    }
}

impl Target for StaticTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> Option<&str> {
        Some(&self.url)
    }

    fn apply(&self, template: &mut RequestTemplate) -> Result<Request> {
        if !template.has_absolute_url() {
            template.target(&self.url);
        }
        template.request()
    }
}

/// A target with no base URL: every call must supply an absolute URL through
/// a URL-override parameter.
#[derive(Debug, Clone)]
pub struct EmptyTarget {
    name: String,
}

impl EmptyTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Target for EmptyTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> Option<&str> {
        None
    }

    fn apply(&self, template: &mut RequestTemplate) -> Result<Request> {
        if !template.has_absolute_url() {
            return Err(Error::Config(
                "request with non-absolute URL not supported with empty target".to_string(),
            ));
        }
        template.request()
    }
}
