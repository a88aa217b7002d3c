//! The compiled client and its per-call invocation pipeline.
//!
//! [`Courier::builder`] compiles an [`ApiDescription`] once into a table of
//! method handlers keyed by method name and configuration key. Each call then
//! runs the pipeline: build a request template from the arguments, apply
//! interceptors, finalize through the target, dispatch over the transport,
//! retry transient failures, and buffer/decode the response or raise a
//! classified error.

use crate::api::{default_expander, ApiDescription, ReturnKind};
use crate::codec::{Decoder, Encoder, JsonDecoder, JsonEncoder};
use crate::contract::{Contract, DefaultContract};
use crate::error::{DefaultErrorDecoder, Error, ErrorDecoder, Result};
use crate::interceptor::Interceptor;
use crate::metadata::MethodMetadata;
use crate::query_map::{FieldQueryMapEncoder, QueryMapEncoder};
use crate::request::Options;
use crate::request_template::RequestTemplate;
use crate::response::Response;
use crate::retry::{DefaultRetryer, Retryer};
use crate::target::{StaticTarget, Target};
use crate::template::{Variable, Variables};
use crate::transport::{ReqwestTransport, Transport};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Responses up to this size are eagerly buffered before a raw response is
/// handed to the caller, trading a small copy for releasing the connection.
const MAX_RESPONSE_BUFFER_SIZE: u64 = 8192;

/// How a retryable error surfaces once attempts are exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropagationPolicy {
    /// Propagate the retryable wrapper error as-is.
    #[default]
    Wrap,
    /// When the wrapper carries an underlying cause, propagate the cause.
    Unwrap,
}

struct Shared {
    transport: Box<dyn Transport>,
    retryer: Box<dyn Retryer>,
    interceptors: Vec<Box<dyn Interceptor>>,
    encoder: Box<dyn Encoder>,
    decoder: Box<dyn Decoder>,
    error_decoder: Box<dyn ErrorDecoder>,
    query_map_encoder: Box<dyn QueryMapEncoder>,
    target: Box<dyn Target>,
    options: Options,
    decode404: bool,
    close_after_decode: bool,
    propagation_policy: PropagationPolicy,
}

enum Outcome {
    Value { value: Value, status: u16 },
    Unit,
    Raw(Response),
}

/// A client for one compiled API description.
///
/// Cheap to clone; all compiled state is shared read-only. Every call gets
/// its own cloned request template and retry state, so concurrent
/// invocations never share mutable data.
#[derive(Clone)]
pub struct Courier {
    handlers: Arc<HashMap<String, MethodHandler>>,
    by_name: Arc<HashMap<String, Option<String>>>,
}

impl Courier {
    /// Creates a builder with default configuration.
    pub fn builder() -> CourierBuilder {
        CourierBuilder::new()
    }

    /// Invokes a method expecting a decoded value.
    ///
    /// `method` is the declared method name, or the configuration key when
    /// two methods share a name. Arguments are positional and must match the
    /// method's declared parameter count.
    pub async fn call<T>(&self, method: &str, args: Vec<Value>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        match self.handler(method)?.invoke(&args).await? {
            Outcome::Value { value, status } => serde_json::from_value(value).map_err(|e| {
                Error::Decode {
                    status,
                    message: e.to_string(),
                    body: bytes::Bytes::new(),
                }
            }),
            Outcome::Unit => serde_json::from_value(Value::Null).map_err(|e| Error::Decode {
                status: 0,
                message: e.to_string(),
                body: bytes::Bytes::new(),
            }),
            Outcome::Raw(_) => Err(Error::Config(format!(
                "method `{method}` returns the raw response; use call_raw"
            ))),
        }
    }

    /// Invokes a method declared with no return value.
    pub async fn call_unit(&self, method: &str, args: Vec<Value>) -> Result<()> {
        self.handler(method)?.invoke(&args).await.map(|_| ())
    }

    /// Invokes a method declared to return the raw [`Response`].
    ///
    /// Unless the response was small enough to buffer eagerly, the body is
    /// still attached to the connection and the caller is responsible for
    /// releasing it (dropping the response suffices).
    pub async fn call_raw(&self, method: &str, args: Vec<Value>) -> Result<Response> {
        match self.handler(method)?.invoke(&args).await? {
            Outcome::Raw(response) => Ok(response),
            _ => Err(Error::Config(format!(
                "method `{method}` does not return the raw response"
            ))),
        }
    }

    /// Configuration keys of every compiled method.
    pub fn config_keys(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    fn handler(&self, method: &str) -> Result<&MethodHandler> {
        if let Some(entry) = self.by_name.get(method) {
            return match entry {
                Some(key) => Ok(&self.handlers[key]),
                None => Err(Error::Config(format!(
                    "method name `{method}` is ambiguous; invoke by configuration key"
                ))),
            };
        }
        self.handlers
            .get(method)
            .ok_or_else(|| Error::Config(format!("unknown method `{method}`")))
    }
}

struct MethodHandler {
    metadata: MethodMetadata,
    shared: Arc<Shared>,
}

impl MethodHandler {
    async fn invoke(&self, args: &[Value]) -> Result<Outcome> {
        let md = &self.metadata;
        if args.len() != md.param_count() {
            return Err(Error::Config(format!(
                "method {} expects {} arguments, got {}",
                md.config_key(),
                md.param_count(),
                args.len()
            )));
        }

        let mut template = self.build_template(args)?;
        let mut retryer = self.shared.retryer.for_call();
        loop {
            let err = match self.execute_and_decode(&mut template).await {
                Ok(outcome) => return Ok(outcome),
                Err(err) if err.is_retryable() => err,
                Err(err) => return Err(err),
            };
            match retryer.continue_or_propagate(&err) {
                Some(interval) => {
                    tracing::warn!(
                        config_key = %md.config_key(),
                        delay_ms = interval.as_millis() as u64,
                        error = %err,
                        "retrying after transient failure"
                    );
                    tokio::time::sleep(interval).await;
                }
                None => return Err(self.propagate(err)),
            }
        }
    }

    fn propagate(&self, err: Error) -> Error {
        match (self.shared.propagation_policy, err) {
            (
                PropagationPolicy::Unwrap,
                Error::Retryable {
                    cause: Some(cause), ..
                },
            ) => *cause,
            (_, err) => err,
        }
    }

    /// The Build phase: clone the method's skeleton and resolve it against
    /// the call's positional arguments.
    fn build_template(&self, args: &[Value]) -> Result<RequestTemplate> {
        let md = &self.metadata;
        let mut template = md.template().clone();

        let mut variables = Variables::new();
        for (index, names) in md.index_to_name() {
            let expander = md
                .index_to_expander()
                .get(index)
                .copied()
                .unwrap_or(default_expander);
            let expanded = expander(&args[*index]);
            let pre_encoded = md.index_to_encoded().get(index).copied().unwrap_or(false);
            for name in names {
                let variable = if pre_encoded {
                    Variable::pre_encoded(expanded.clone())
                } else {
                    Variable::new(expanded.clone())
                };
                variables.insert(name.clone(), variable);
            }
        }

        // Named parameters bound to no template serialize through the
        // encoder as one form object.
        if !md.form_params().is_empty() {
            let mut form = serde_json::Map::new();
            for (index, names) in md.index_to_name() {
                for name in names {
                    if md.form_params().iter().any(|p| p == name) {
                        form.insert(name.clone(), args[*index].clone());
                    }
                }
            }
            self.shared
                .encoder
                .encode(&Value::Object(form), "form", &mut template)?;
        }

        if let Some(index) = md.body_index() {
            if template.has_body_template() {
                // A declared body template fills from the body argument's
                // fields; named parameters take precedence.
                if let Value::Object(map) = &args[index] {
                    for (name, value) in map {
                        variables
                            .entry(name.clone())
                            .or_insert_with(|| Variable::new(default_expander(value)));
                    }
                }
            } else {
                let body_ty = md.body_ty().unwrap_or("Value");
                self.shared.encoder.encode(&args[index], body_ty, &mut template)?;
            }
        }

        if let Some(index) = md.url_index() {
            let url = match &args[index] {
                Value::String(url) => url,
                other => {
                    return Err(Error::Config(format!(
                        "URL-override argument for {} must be a string, got {other}",
                        md.config_key()
                    )));
                }
            };
            if !template.has_absolute_url() {
                template.target(url);
            }
        }

        let mut resolved = template.resolve(&variables)?;

        // Map-shaped arguments merge into the resolved template so their
        // contents are data, never placeholder syntax.
        if let Some(index) = md.query_map_index() {
            for (name, value) in self.shared.query_map_encoder.encode(&args[index])? {
                resolved.query(name, value);
            }
        }

        if let Some(index) = md.header_map_index() {
            merge_header_map(&mut resolved, &args[index], md.config_key())?;
        }

        Ok(resolved)
    }

    /// One dispatch attempt: Intercept, Target, Dispatch, Buffer/Decode.
    async fn execute_and_decode(&self, template: &mut RequestTemplate) -> Result<Outcome> {
        let md = &self.metadata;

        for interceptor in &self.shared.interceptors {
            interceptor.apply(template);
        }
        let request = self.shared.target.apply(template)?;

        tracing::debug!(
            config_key = %md.config_key(),
            method = %request.method(),
            url = %request.url(),
            "dispatching request"
        );
        let start = Instant::now();
        let response = match self
            .shared
            .transport
            .execute(request, &self.shared.options)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(
                    config_key = %md.config_key(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    error = %err,
                    "transport dispatch failed"
                );
                return Err(err);
            }
        };
        let status = response.status().as_u16();
        tracing::info!(
            config_key = %md.config_key(),
            status,
            latency_ms = start.elapsed().as_millis() as u64,
            "received response"
        );

        if md.return_kind() == ReturnKind::Raw {
            // Small bodies of known length are buffered so an ignorable
            // response does not hold its connection open; otherwise body
            // ownership transfers to the caller unbuffered.
            return match response.body().length() {
                Some(length)
                    if length <= MAX_RESPONSE_BUFFER_SIZE && self.shared.close_after_decode =>
                {
                    Ok(Outcome::Raw(response.buffer().await?))
                }
                _ => Ok(Outcome::Raw(response)),
            };
        }

        if (200..300).contains(&status) {
            if md.return_kind() == ReturnKind::Unit {
                return Ok(Outcome::Unit);
            }
            return self.decode(response).await;
        }

        if self.shared.decode404 && status == 404 && md.return_kind() != ReturnKind::Unit {
            return self.decode(response).await;
        }

        let response = response.buffer_best_effort().await;
        let body = response.body_bytes();
        let err = self
            .shared
            .error_decoder
            .decode(md.config_key(), &response, body);
        if status >= 500 {
            tracing::warn!(config_key = %md.config_key(), status, error = %err, "server error");
        } else {
            tracing::error!(config_key = %md.config_key(), status, error = %err, "client error");
        }
        Err(err)
    }

    async fn decode(&self, response: Response) -> Result<Outcome> {
        let response = response.buffer().await?;
        let status = response.status().as_u16();
        let body = response.body_bytes();
        match self.shared.decoder.decode(&response, &body) {
            Ok(value) => Ok(Outcome::Value { value, status }),
            Err(err) => {
                tracing::error!(
                    config_key = %self.metadata.config_key(),
                    error = %err,
                    "failed to decode response"
                );
                Err(err)
            }
        }
    }
}

fn merge_header_map(template: &mut RequestTemplate, arg: &Value, config_key: &str) -> Result<()> {
    let map = match arg {
        Value::Object(map) => map,
        Value::Null => return Ok(()),
        other => {
            return Err(Error::Encode(format!(
                "header map argument for {config_key} must be an object, got {other}"
            )));
        }
    };
    for (name, value) in map {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    template.append_header(name, default_expander(item));
                }
            }
            other => {
                template.append_header(name, default_expander(other));
            }
        }
    }
    Ok(())
}

/// Builder for configuring and compiling a [`Courier`].
pub struct CourierBuilder {
    target: Option<Box<dyn Target>>,
    transport: Option<Box<dyn Transport>>,
    contract: Box<dyn Contract>,
    retryer: Box<dyn Retryer>,
    interceptors: Vec<Box<dyn Interceptor>>,
    encoder: Box<dyn Encoder>,
    decoder: Box<dyn Decoder>,
    error_decoder: Box<dyn ErrorDecoder>,
    query_map_encoder: Box<dyn QueryMapEncoder>,
    options: Options,
    decode404: bool,
    close_after_decode: bool,
    propagation_policy: PropagationPolicy,
}

impl CourierBuilder {
    pub fn new() -> Self {
        Self {
            target: None,
            transport: None,
            contract: Box::new(DefaultContract),
            retryer: Box::new(DefaultRetryer::default()),
            interceptors: Vec::new(),
            encoder: Box::new(JsonEncoder),
            decoder: Box::new(JsonDecoder),
            error_decoder: Box::new(DefaultErrorDecoder),
            query_map_encoder: Box::new(FieldQueryMapEncoder),
            options: Options::default(),
            decode404: false,
            close_after_decode: true,
            propagation_policy: PropagationPolicy::default(),
        }
    }

    /// Sets the base URL all relative request URIs resolve against.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn target(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.target = Some(Box::new(StaticTarget::new(url)?));
        Ok(self)
    }

    /// Installs a custom [`Target`].
    pub fn target_to(mut self, target: impl Target + 'static) -> Self {
        self.target = Some(Box::new(target));
        self
    }

    /// Replaces the default reqwest-backed transport.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Replaces the default contract compiler.
    pub fn contract(mut self, contract: impl Contract + 'static) -> Self {
        self.contract = Box::new(contract);
        self
    }

    /// Sets the retry policy prototype, cloned per call.
    pub fn retryer(mut self, retryer: impl Retryer + 'static) -> Self {
        self.retryer = Box::new(retryer);
        self
    }

    /// Registers an interceptor; interceptors run in registration order.
    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Box::new(interceptor));
        self
    }

    pub fn encoder(mut self, encoder: impl Encoder + 'static) -> Self {
        self.encoder = Box::new(encoder);
        self
    }

    pub fn decoder(mut self, decoder: impl Decoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    pub fn error_decoder(mut self, error_decoder: impl ErrorDecoder + 'static) -> Self {
        self.error_decoder = Box::new(error_decoder);
        self
    }

    pub fn query_map_encoder(mut self, encoder: impl QueryMapEncoder + 'static) -> Self {
        self.query_map_encoder = Box::new(encoder);
        self
    }

    /// Transport options: timeouts and redirect behavior.
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Decodes 404 responses as success for value-returning methods.
    pub fn decode404(mut self, enabled: bool) -> Self {
        self.decode404 = enabled;
        self
    }

    /// When disabled, raw-returning methods always receive the response
    /// unbuffered, even when its body is small.
    pub fn close_after_decode(mut self, enabled: bool) -> Self {
        self.close_after_decode = enabled;
        self
    }

    pub fn propagation_policy(mut self, policy: PropagationPolicy) -> Self {
        self.propagation_policy = policy;
        self
    }

    /// Compiles `api` and builds the client.
    ///
    /// # Errors
    ///
    /// Returns a contract error if the description fails validation, or a
    /// configuration error if no target was provided.
    pub fn build(self, api: &ApiDescription) -> Result<Courier> {
        let target = self
            .target
            .ok_or_else(|| Error::Config("target is required".to_string()))?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Box::new(ReqwestTransport::new(&self.options)?),
        };

        let metadata = self.contract.parse_and_validate(api)?;
        tracing::debug!(api = api.name(), methods = metadata.len(), "compiled API description");

        let shared = Arc::new(Shared {
            transport,
            retryer: self.retryer,
            interceptors: self.interceptors,
            encoder: self.encoder,
            decoder: self.decoder,
            error_decoder: self.error_decoder,
            query_map_encoder: self.query_map_encoder,
            target,
            options: self.options,
            decode404: self.decode404,
            close_after_decode: self.close_after_decode,
            propagation_policy: self.propagation_policy,
        });

        let mut handlers = HashMap::new();
        let mut by_name: HashMap<String, Option<String>> = HashMap::new();
        for md in metadata {
            let key = md.config_key().to_string();
            by_name
                .entry(md.method_name().to_string())
                .and_modify(|entry| *entry = None)
                .or_insert_with(|| Some(key.clone()));
            handlers.insert(
                key,
                MethodHandler {
                    metadata: md,
                    shared: shared.clone(),
                },
            );
        }

        Ok(Courier {
            handlers: Arc::new(handlers),
            by_name: Arc::new(by_name),
        })
    }
}

impl Default for CourierBuilder {
    fn default() -> Self {
        Self::new()
    }
}
