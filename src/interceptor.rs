//! Request interceptors: cross-cutting template mutation before dispatch.

use crate::request_template::RequestTemplate;
use base64::Engine;

/// Invoked once per call, in registration order, before the target finalizes
/// the request. Interceptors may add or replace headers, query data, or the
/// body. The same instance runs for every concurrent invocation, so
/// implementations must be safe for concurrent `apply` calls and must not
/// assume exclusivity: when several interceptors write one header, the last
/// write wins.
pub trait Interceptor: Send + Sync {
    fn apply(&self, template: &mut RequestTemplate);
}

/// Adds an HTTP Basic `Authorization` header to every request.
pub struct BasicAuthInterceptor {
    header_value: String,
}

impl BasicAuthInterceptor {
    pub fn new(username: impl AsRef<str>, password: impl AsRef<str>) -> Self {
        let credentials = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", username.as_ref(), password.as_ref()));
        Self {
            header_value: format!("Basic {credentials}"),
        }
    }
}

impl Interceptor for BasicAuthInterceptor {
    fn apply(&self, template: &mut RequestTemplate) {
        template.header("Authorization", self.header_value.clone());
    }
}
