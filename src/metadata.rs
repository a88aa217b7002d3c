//! Compiled, immutable descriptions of API methods.

use crate::api::{Expander, ReturnKind};
use crate::request_template::RequestTemplate;
use std::collections::BTreeMap;

/// Everything the invocation pipeline needs to know about one API method,
/// produced once by the contract compiler and shared read-only across all
/// concurrent invocations of that method.
#[derive(Debug, Clone)]
pub struct MethodMetadata {
    pub(crate) config_key: String,
    pub(crate) method_name: String,
    pub(crate) return_kind: ReturnKind,
    pub(crate) template: RequestTemplate,
    pub(crate) param_count: usize,
    pub(crate) url_index: Option<usize>,
    pub(crate) body_index: Option<usize>,
    pub(crate) body_ty: Option<String>,
    pub(crate) header_map_index: Option<usize>,
    pub(crate) query_map_index: Option<usize>,
    pub(crate) query_map_encoded: bool,
    pub(crate) form_params: Vec<String>,
    pub(crate) index_to_name: BTreeMap<usize, Vec<String>>,
    pub(crate) index_to_expander: BTreeMap<usize, Expander>,
    pub(crate) index_to_encoded: BTreeMap<usize, bool>,
}

impl MethodMetadata {
    pub(crate) fn new(method_name: impl Into<String>) -> Self {
        Self {
            config_key: String::new(),
            method_name: method_name.into(),
            return_kind: ReturnKind::default(),
            template: RequestTemplate::new(),
            param_count: 0,
            url_index: None,
            body_index: None,
            body_ty: None,
            header_map_index: None,
            query_map_index: None,
            query_map_encoded: false,
            form_params: Vec::new(),
            index_to_name: BTreeMap::new(),
            index_to_expander: BTreeMap::new(),
            index_to_encoded: BTreeMap::new(),
        }
    }

    /// The unique key identifying this method across the pipeline, retry,
    /// and logging subsystems: `"{Api}#{method}({Ty1},{Ty2})"`.
    pub fn config_key(&self) -> &str {
        &self.config_key
    }

    /// The declared method name, the identifier callers invoke by.
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn return_kind(&self) -> ReturnKind {
        self.return_kind
    }

    /// The request template skeleton cloned for every call.
    pub fn template(&self) -> &RequestTemplate {
        &self.template
    }

    pub fn param_count(&self) -> usize {
        self.param_count
    }

    /// Index of the parameter supplying a full/override URL, if any.
    pub fn url_index(&self) -> Option<usize> {
        self.url_index
    }

    pub fn body_index(&self) -> Option<usize> {
        self.body_index
    }

    pub fn body_ty(&self) -> Option<&str> {
        self.body_ty.as_deref()
    }

    pub fn header_map_index(&self) -> Option<usize> {
        self.header_map_index
    }

    pub fn query_map_index(&self) -> Option<usize> {
        self.query_map_index
    }

    /// Whether query-map values are supplied pre-encoded.
    pub fn query_map_encoded(&self) -> bool {
        self.query_map_encoded
    }

    /// Named parameters that appear in no template; serialized through the
    /// encoder as a form object.
    pub fn form_params(&self) -> &[String] {
        &self.form_params
    }

    /// Ordered map from parameter index to the template variables it fills.
    pub fn index_to_name(&self) -> &BTreeMap<usize, Vec<String>> {
        &self.index_to_name
    }

    pub fn index_to_expander(&self) -> &BTreeMap<usize, Expander> {
        &self.index_to_expander
    }

    pub fn index_to_encoded(&self) -> &BTreeMap<usize, bool> {
        &self.index_to_encoded
    }
}
