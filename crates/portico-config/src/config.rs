//! Layer building and the resolved configuration view.
//!
//! A [`ConfigLayer`] is one partial configuration: framework defaults, a
//! handler-family layer, or per-function overrides. Layers are plain value
//! trees; [`Config::resolve`] folds them with the merge rules in
//! [`crate::value`] and the result is immutable - every accessor reads the
//! resolved tree, and an absent section behaves exactly like an explicitly
//! disabled one.
//!
//! Accessors that recover opaque leaves (schemas, factories, stages) return
//! a configuration fault when the slot holds something of the wrong type.
//! That is a caller defect and must not be silently swallowed.

use crate::options::{
    CorsOptions, EncodingOptions, ErrorCallback, RequestContentOptions, ResponseContentOptions,
    SecurityOptions, SerializerBinding, Severity, StageHandle, WarmupOptions,
};
use crate::value::{merge, resolve, ConfigValue, Scalar};
use indexmap::IndexMap;
use portico_core::{Fault, Schema, Stage};
use portico_telemetry::{LogLevel, LoggerFactory, MetricsOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

const LOGGER_LABEL: &str = "logger-factory";
const SCHEMA_LABEL: &str = "schema";
const SERIALIZER_LABEL: &str = "serializer";
const STAGE_LABEL: &str = "stage";
const WARMUP_LABEL: &str = "warmup";
const ON_ERROR_LABEL: &str = "error-callback";

fn data<T: Serialize>(value: &T) -> ConfigValue {
    serde_json::to_value(value)
        .map(|json| ConfigValue::from_json(&json))
        .unwrap_or_else(|_| ConfigValue::null())
}

fn insert_at(members: &mut IndexMap<String, ConfigValue>, path: &[&str], value: ConfigValue) {
    match path {
        [] => {}
        [last] => {
            members.insert((*last).to_owned(), value);
        }
        [head, rest @ ..] => {
            let child = members
                .entry((*head).to_owned())
                .or_insert_with(ConfigValue::map);
            if !matches!(child, ConfigValue::Map(_)) {
                *child = ConfigValue::map();
            }
            if let ConfigValue::Map(child) = child {
                insert_at(child, rest, value);
            }
        }
    }
}

/// One partial configuration layer.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    root: IndexMap<String, ConfigValue>,
}

impl ConfigLayer {
    /// Creates an empty layer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: IndexMap::new(),
        }
    }

    fn with(mut self, path: &[&str], value: ConfigValue) -> Self {
        insert_at(&mut self.root, path, value);
        self
    }

    /// Sets the logger factory (`monitoring.logger`).
    #[must_use]
    pub fn logger(self, factory: LoggerFactory) -> Self {
        self.with(
            &["monitoring", "logger"],
            ConfigValue::opaque(LOGGER_LABEL, factory),
        )
    }

    /// Sets the log level (`monitoring.logLevel`).
    #[must_use]
    pub fn log_level(self, level: LogLevel) -> Self {
        self.with(
            &["monitoring", "logLevel"],
            ConfigValue::Scalar(Scalar::Str(level.as_str().to_owned())),
        )
    }

    /// Toggles pipeline profiling (`monitoring.enableProfiling`).
    #[must_use]
    pub fn enable_profiling(self, enabled: bool) -> Self {
        self.with(
            &["monitoring", "enableProfiling"],
            ConfigValue::Scalar(Scalar::Bool(enabled)),
        )
    }

    /// Toggles metrics emission (`monitoring.metrics`).
    #[must_use]
    pub fn metrics(self, enabled: bool) -> Self {
        self.with(
            &["monitoring", "metrics"],
            ConfigValue::Scalar(Scalar::Bool(enabled)),
        )
    }

    /// Enables metrics with options (`monitoring.metrics`).
    #[must_use]
    pub fn metrics_options(self, options: MetricsOptions) -> Self {
        self.with(&["monitoring", "metrics"], data(&options))
    }

    /// Sets the CORS options (`transport.cors`).
    #[must_use]
    pub fn cors(self, options: CorsOptions) -> Self {
        self.with(&["transport", "cors"], data(&options))
    }

    /// Sets the security-header options (`transport.security`).
    #[must_use]
    pub fn security(self, options: SecurityOptions) -> Self {
        self.with(&["transport", "security"], data(&options))
    }

    /// Sets the content-encoding options (`transport.encoding`).
    #[must_use]
    pub fn encoding(self, options: EncodingOptions) -> Self {
        self.with(&["transport", "encoding"], data(&options))
    }

    /// Sets request content negotiation options
    /// (`transport.content.request`).
    #[must_use]
    pub fn request_content(self, options: RequestContentOptions) -> Self {
        self.with(&["transport", "content", "request"], data(&options))
    }

    /// Sets response serialization options (`transport.content.response`).
    #[must_use]
    pub fn response_content(self, options: ResponseContentOptions) -> Self {
        let mut members = IndexMap::new();
        members.insert(
            "serializers".to_owned(),
            ConfigValue::List(
                options
                    .serializers
                    .into_iter()
                    .map(|binding| ConfigValue::opaque(SERIALIZER_LABEL, binding))
                    .collect(),
            ),
        );
        if let Some(default) = options.default_content_type {
            members.insert(
                "defaultContentType".to_owned(),
                ConfigValue::Scalar(Scalar::Str(default)),
            );
        }
        self.with(
            &["transport", "content", "response"],
            ConfigValue::Map(members),
        )
    }

    /// Sets the request-body schema (`parser.request`).
    #[must_use]
    pub fn request_schema(self, schema: Schema) -> Self {
        self.with(
            &["parser", "request"],
            ConfigValue::opaque(SCHEMA_LABEL, schema),
        )
    }

    /// Sets the path-parameters schema (`parser.path`).
    #[must_use]
    pub fn path_schema(self, schema: Schema) -> Self {
        self.with(&["parser", "path"], ConfigValue::opaque(SCHEMA_LABEL, schema))
    }

    /// Sets the query-parameters schema (`parser.query`).
    #[must_use]
    pub fn query_schema(self, schema: Schema) -> Self {
        self.with(
            &["parser", "query"],
            ConfigValue::opaque(SCHEMA_LABEL, schema),
        )
    }

    /// Sets the response-body schema (`parser.response`).
    #[must_use]
    pub fn response_schema(self, schema: Schema) -> Self {
        self.with(
            &["parser", "response"],
            ConfigValue::opaque(SCHEMA_LABEL, schema),
        )
    }

    /// Sets the response-validation severity (`parser.validateResponses`).
    #[must_use]
    pub fn validate_responses(self, severity: Severity) -> Self {
        self.with(
            &["parser", "validateResponses"],
            ConfigValue::Scalar(Scalar::Str(severity.as_str().to_owned())),
        )
    }

    /// Appends a caller-supplied stage to this layer's `extensions` list.
    ///
    /// Lists replace across layers, so a later layer's extensions override
    /// an earlier layer's wholesale.
    #[must_use]
    pub fn extend(mut self, stage: Arc<dyn Stage>) -> Self {
        let handle = ConfigValue::opaque(STAGE_LABEL, StageHandle::new(stage));
        match self.root.get_mut("extensions") {
            Some(ConfigValue::List(items)) => items.push(handle),
            _ => {
                self.root
                    .insert("extensions".to_owned(), ConfigValue::List(vec![handle]));
            }
        }
        self
    }

    /// Sets the warmup options (`lifecycle.warmup`).
    #[must_use]
    pub fn warmup(self, options: WarmupOptions) -> Self {
        self.with(
            &["lifecycle", "warmup"],
            ConfigValue::opaque(WARMUP_LABEL, options),
        )
    }

    /// Sets the fault callback (`lifecycle.onError`).
    #[must_use]
    pub fn on_error(self, callback: impl Fn(&Fault) + Send + Sync + 'static) -> Self {
        self.with(
            &["lifecycle", "onError"],
            ConfigValue::opaque(ON_ERROR_LABEL, ErrorCallback::new(callback)),
        )
    }

    /// Sets an arbitrary node by dotted path. Escape hatch for options this
    /// builder has no setter for, and the way to disable an inherited
    /// section with an explicit null.
    #[must_use]
    pub fn set(self, dotted_path: &str, value: ConfigValue) -> Self {
        let path: Vec<&str> = dotted_path.split('.').collect();
        self.with(&path, value)
    }

    /// Consumes the layer into its value tree.
    #[must_use]
    pub fn into_value(self) -> ConfigValue {
        ConfigValue::Map(self.root)
    }
}

impl Default for ConfigLayer {
    fn default() -> Self {
        Self::new()
    }
}

/// The immutable resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    root: ConfigValue,
}

impl Config {
    /// Resolves layers into one effective configuration, lowest precedence
    /// first.
    #[must_use]
    pub fn resolve<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = ConfigLayer>,
    {
        Self {
            root: resolve(layers.into_iter().map(ConfigLayer::into_value)),
        }
    }

    /// Produces a new configuration with one more layer on top. The
    /// receiver is untouched.
    #[must_use]
    pub fn merged(&self, layer: ConfigLayer) -> Self {
        Self {
            root: merge(&self.root, &layer.into_value()),
        }
    }

    /// The resolved value tree.
    #[must_use]
    pub fn value(&self) -> &ConfigValue {
        &self.root
    }

    /// A present, non-null node. Explicit null reads as absent.
    fn node(&self, path: &[&str]) -> Option<&ConfigValue> {
        self.root.get_path(path).filter(|node| !node.is_null())
    }

    fn data_section<T: DeserializeOwned>(&self, path: &[&str]) -> Result<Option<T>, Fault> {
        let Some(node) = self.node(path) else {
            return Ok(None);
        };
        let json = node.to_json().ok_or_else(|| {
            Fault::configuration(format!(
                "configuration section {} contains an opaque value",
                path.join(".")
            ))
        })?;
        serde_json::from_value(json).map(Some).map_err(|err| {
            Fault::configuration(format!(
                "configuration section {} is malformed: {err}",
                path.join(".")
            ))
        })
    }

    fn opaque_section<T: Send + Sync + 'static>(
        &self,
        path: &[&str],
        expected: &str,
    ) -> Result<Option<Arc<T>>, Fault> {
        let Some(node) = self.node(path) else {
            return Ok(None);
        };
        let opaque = node.as_opaque().ok_or_else(|| {
            Fault::configuration(format!(
                "configuration slot {} holds a plain value where {expected} was expected",
                path.join(".")
            ))
        })?;
        opaque.downcast::<T>().map(Some).ok_or_else(|| {
            Fault::configuration(format!(
                "configuration slot {} holds {} where {expected} was expected",
                path.join("."),
                opaque.label()
            ))
        })
    }

    /// The configured log level, defaulting to `info`.
    #[must_use]
    pub fn log_level(&self) -> LogLevel {
        self.node(&["monitoring", "logLevel"])
            .and_then(ConfigValue::as_str)
            .and_then(|text| text.parse().ok())
            .unwrap_or(LogLevel::Info)
    }

    /// The configured logger factory.
    ///
    /// # Errors
    ///
    /// Configuration fault when the slot holds something else.
    pub fn logger_factory(&self) -> Result<Option<LoggerFactory>, Fault> {
        Ok(self
            .opaque_section::<LoggerFactory>(&["monitoring", "logger"], "a logger factory")?
            .map(|factory| (*factory).clone()))
    }

    /// Whether stage profiling is enabled.
    #[must_use]
    pub fn profiling_enabled(&self) -> bool {
        self.node(&["monitoring", "enableProfiling"])
            .and_then(ConfigValue::as_bool)
            .unwrap_or(false)
    }

    /// The metrics options, when metrics are enabled. `false` and absent
    /// both disable; `true` enables with defaults.
    ///
    /// # Errors
    ///
    /// Configuration fault when the slot holds an unusable shape.
    pub fn metrics(&self) -> Result<Option<MetricsOptions>, Fault> {
        match self.node(&["monitoring", "metrics"]) {
            None => Ok(None),
            Some(node) => match node.as_bool() {
                Some(false) => Ok(None),
                Some(true) => Ok(Some(MetricsOptions::default())),
                None => self.data_section(&["monitoring", "metrics"]),
            },
        }
    }

    /// The CORS options, when configured.
    ///
    /// # Errors
    ///
    /// Configuration fault when the section is malformed.
    pub fn cors(&self) -> Result<Option<CorsOptions>, Fault> {
        self.data_section(&["transport", "cors"])
    }

    /// The security-header options, when configured.
    ///
    /// # Errors
    ///
    /// Configuration fault when the section is malformed.
    pub fn security(&self) -> Result<Option<SecurityOptions>, Fault> {
        self.data_section(&["transport", "security"])
    }

    /// The content-encoding options, when configured.
    ///
    /// # Errors
    ///
    /// Configuration fault when the section is malformed.
    pub fn encoding(&self) -> Result<Option<EncodingOptions>, Fault> {
        self.data_section(&["transport", "encoding"])
    }

    /// The request content negotiation options, when configured.
    ///
    /// # Errors
    ///
    /// Configuration fault when the section is malformed.
    pub fn request_content(&self) -> Result<Option<RequestContentOptions>, Fault> {
        self.data_section(&["transport", "content", "request"])
    }

    /// The response serialization options, when configured.
    ///
    /// # Errors
    ///
    /// Configuration fault when the section is malformed or a serializer
    /// slot holds something else.
    pub fn response_content(&self) -> Result<Option<ResponseContentOptions>, Fault> {
        let Some(node) = self.node(&["transport", "content", "response"]) else {
            return Ok(None);
        };
        let mut serializers = Vec::new();
        if let Some(list) = node.get("serializers") {
            let ConfigValue::List(items) = list else {
                return Err(Fault::configuration(
                    "transport.content.response.serializers must be a list",
                ));
            };
            for item in items {
                let binding = item
                    .as_opaque()
                    .and_then(|opaque| opaque.downcast::<SerializerBinding>())
                    .ok_or_else(|| {
                        Fault::configuration(
                            "transport.content.response.serializers entries must be serializer bindings",
                        )
                    })?;
                serializers.push((*binding).clone());
            }
        }
        let default_content_type = node
            .get("defaultContentType")
            .and_then(ConfigValue::as_str)
            .map(ToOwned::to_owned);
        Ok(Some(ResponseContentOptions {
            serializers,
            default_content_type,
        }))
    }

    /// Whether the parser section is present at all (it gates the
    /// validation stage).
    #[must_use]
    pub fn parser_present(&self) -> bool {
        self.node(&["parser"]).is_some()
    }

    fn schema_slot(&self, key: &str) -> Result<Option<Schema>, Fault> {
        Ok(self
            .opaque_section::<Schema>(&["parser", key], "a schema")?
            .map(|schema| (*schema).clone()))
    }

    /// The request-body schema, when configured.
    ///
    /// # Errors
    ///
    /// Configuration fault when the slot holds something other than a
    /// schema.
    pub fn request_schema(&self) -> Result<Option<Schema>, Fault> {
        self.schema_slot("request")
    }

    /// The path-parameters schema, when configured.
    ///
    /// # Errors
    ///
    /// Configuration fault when the slot holds something other than a
    /// schema.
    pub fn path_schema(&self) -> Result<Option<Schema>, Fault> {
        self.schema_slot("path")
    }

    /// The query-parameters schema, when configured.
    ///
    /// # Errors
    ///
    /// Configuration fault when the slot holds something other than a
    /// schema.
    pub fn query_schema(&self) -> Result<Option<Schema>, Fault> {
        self.schema_slot("query")
    }

    /// The response-body schema, when configured.
    ///
    /// # Errors
    ///
    /// Configuration fault when the slot holds something other than a
    /// schema.
    pub fn response_schema(&self) -> Result<Option<Schema>, Fault> {
        self.schema_slot("response")
    }

    /// The response-validation severity, defaulting to `error`.
    #[must_use]
    pub fn validate_responses(&self) -> Severity {
        self.node(&["parser", "validateResponses"])
            .and_then(ConfigValue::as_str)
            .and_then(|text| text.parse().ok())
            .unwrap_or_default()
    }

    /// The caller-supplied extension stages, in order.
    ///
    /// # Errors
    ///
    /// Configuration fault when an entry is not a stage.
    pub fn extensions(&self) -> Result<Vec<Arc<dyn Stage>>, Fault> {
        let Some(node) = self.node(&["extensions"]) else {
            return Ok(Vec::new());
        };
        let ConfigValue::List(items) = node else {
            return Err(Fault::configuration("extensions must be a list of stages"));
        };
        let mut stages = Vec::with_capacity(items.len());
        for item in items {
            let handle = item
                .as_opaque()
                .and_then(|opaque| opaque.downcast::<StageHandle>())
                .ok_or_else(|| {
                    Fault::configuration("extensions entries must be pipeline stages")
                })?;
            stages.push(handle.stage());
        }
        Ok(stages)
    }

    /// The warmup options, when configured.
    ///
    /// # Errors
    ///
    /// Configuration fault when the slot holds something else.
    pub fn warmup(&self) -> Result<Option<WarmupOptions>, Fault> {
        Ok(self
            .opaque_section::<WarmupOptions>(&["lifecycle", "warmup"], "warmup options")?
            .map(|options| (*options).clone()))
    }

    /// The fault callback, when configured.
    ///
    /// # Errors
    ///
    /// Configuration fault when the slot holds something else.
    pub fn on_error(&self) -> Result<Option<ErrorCallback>, Fault> {
        Ok(self
            .opaque_section::<ErrorCallback>(&["lifecycle", "onError"], "an error callback")?
            .map(|callback| (*callback).clone()))
    }
}
