//! The declarative API description consumed by the contract compiler.
//!
//! An [`ApiDescription`] is the Rust-native stand-in for an annotated client
//! interface: a named contract whose methods each declare a request line, any
//! static headers, an optional body template, and per-parameter bindings.
//! Descriptions are plain data built with fluent constructors; the compiler
//! reads them once and they are never consulted again at call time.
//!
//! # Examples
//!
//! ```
//! use courier::{ApiDescription, MethodDescription, Param, ReturnKind};
//!
//! let api = ApiDescription::new("GitHub")
//!     .header("Accept: application/json")
//!     .method(
//!         MethodDescription::new("contributors", "GET /repos/{owner}/{repo}/contributors")
//!             .param(Param::named("owner", "String"))
//!             .param(Param::named("repo", "String"))
//!             .returns(ReturnKind::Decoded),
//!     );
//! assert_eq!(api.methods().len(), 1);
//! ```

use crate::template::CollectionFormat;
use serde_json::Value;

/// Converts a call-time argument into the string substituted for its
/// template variable.
pub type Expander = fn(&Value) -> String;

/// The default expander: a value's natural string form. Strings render
/// without quotes; everything else renders as compact JSON.
pub fn default_expander(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// What a method's invocation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnKind {
    /// No value; a success status is the whole result.
    Unit,
    /// A decoded value.
    #[default]
    Decoded,
    /// The raw [`crate::Response`], undecoded.
    Raw,
}

/// The role a parameter plays in the request.
#[derive(Debug, Clone)]
pub enum ParamBinding {
    /// Fills the template variable(s) of this name (path, query, or header).
    /// A named parameter whose name appears nowhere in the method's templates
    /// is a form parameter.
    Named {
        name: String,
        expander: Option<Expander>,
        encoded: bool,
    },
    /// Flattened into query parameters.
    QueryMap { encoded: bool },
    /// Merged into request headers.
    HeaderMap,
    /// Supplies a full URL, overriding the target when none is absolute yet.
    Url,
    /// The request body.
    Body,
}

/// One method parameter: its declared type (for config-key derivation) and
/// its binding.
#[derive(Debug, Clone)]
pub struct Param {
    ty: String,
    binding: ParamBinding,
}

impl Param {
    /// A named template parameter.
    pub fn named(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            binding: ParamBinding::Named {
                name: name.into(),
                expander: None,
                encoded: false,
            },
        }
    }

    /// A query-map parameter, flattened into query pairs at call time.
    pub fn query_map(ty: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            binding: ParamBinding::QueryMap { encoded: false },
        }
    }

    /// A header-map parameter, merged into headers at call time.
    pub fn header_map(ty: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            binding: ParamBinding::HeaderMap,
        }
    }

    /// A URL-override parameter.
    pub fn url(ty: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            binding: ParamBinding::Url,
        }
    }

    /// A body parameter.
    pub fn body(ty: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            binding: ParamBinding::Body,
        }
    }

    /// Marks the value as already percent-encoded.
    pub fn encoded(mut self) -> Self {
        match &mut self.binding {
            ParamBinding::Named { encoded, .. } => *encoded = true,
            ParamBinding::QueryMap { encoded } => *encoded = true,
            _ => {}
        }
        self
    }

    /// Installs a custom value expander.
    pub fn expander(mut self, f: Expander) -> Self {
        if let ParamBinding::Named { expander, .. } = &mut self.binding {
            *expander = Some(f);
        }
        self
    }

    pub fn ty(&self) -> &str {
        &self.ty
    }

    pub fn binding(&self) -> &ParamBinding {
        &self.binding
    }
}

/// One declared API method.
#[derive(Debug, Clone)]
pub struct MethodDescription {
    name: String,
    request_line: String,
    headers: Vec<String>,
    body: Option<String>,
    return_kind: ReturnKind,
    params: Vec<Param>,
    decode_slash: bool,
    collection_format: CollectionFormat,
}

impl MethodDescription {
    /// `request_line` is `"VERB /path?query"`, e.g. `"GET /repos/{owner}"`.
    pub fn new(name: impl Into<String>, request_line: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            request_line: request_line.into(),
            headers: Vec::new(),
            body: None,
            return_kind: ReturnKind::default(),
            params: Vec::new(),
            decode_slash: true,
            collection_format: CollectionFormat::default(),
        }
    }

    /// Adds a static header in `"Name: value"` form. Values may contain
    /// `{placeholders}` filled from named parameters.
    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.headers.push(header.into());
        self
    }

    /// Declares the request body: a raw literal, or a template when the
    /// string contains `{placeholders}`.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn returns(mut self, kind: ReturnKind) -> Self {
        self.return_kind = kind;
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Keeps `%2F` sequences encoded in expanded paths.
    pub fn keep_encoded_slashes(mut self) -> Self {
        self.decode_slash = false;
        self
    }

    pub fn collection_format(mut self, format: CollectionFormat) -> Self {
        self.collection_format = format;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn request_line(&self) -> &str {
        &self.request_line
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn body_decl(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn return_kind(&self) -> ReturnKind {
        self.return_kind
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn decode_slash(&self) -> bool {
        self.decode_slash
    }

    pub fn collection_format_value(&self) -> CollectionFormat {
        self.collection_format
    }
}

/// A named API contract: class-level headers, methods, and at most one level
/// of single inheritance from a parent description.
#[derive(Debug, Clone, Default)]
pub struct ApiDescription {
    name: String,
    type_params: Vec<String>,
    parent: Option<Box<ApiDescription>>,
    headers: Vec<String>,
    methods: Vec<MethodDescription>,
}

impl ApiDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Declares a generic type parameter. Descriptions with type parameters
    /// are rejected at compile time; the field exists so generated
    /// descriptions surface the violation instead of silently dropping it.
    pub fn type_param(mut self, name: impl Into<String>) -> Self {
        self.type_params.push(name.into());
        self
    }

    /// Sets the parent description this one inherits from.
    pub fn extends(mut self, parent: ApiDescription) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// Adds a class-level static header in `"Name: value"` form, applied to
    /// every method.
    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.headers.push(header.into());
        self
    }

    pub fn method(mut self, method: MethodDescription) -> Self {
        self.methods.push(method);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_params(&self) -> &[String] {
        &self.type_params
    }

    pub fn parent(&self) -> Option<&ApiDescription> {
        self.parent.as_deref()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn methods(&self) -> &[MethodDescription] {
        &self.methods
    }
}
