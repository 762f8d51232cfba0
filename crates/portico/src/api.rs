//! The handler-wrapping facade.
//!
//! An [`Api`] carries the configuration shared by a family of handlers:
//! framework defaults resolved under an optional family layer, once, at
//! construction. [`Api::function`] resolves one more per-function layer on
//! top, assembles the pipeline, and binds the handler into a [`Function`]
//! whose [`Function::invoke`] is what the hosting runtime calls per
//! request.
//!
//! Resolution happens at definition time only; invocations share the
//! immutable result. A configuration defect found during assembly does not
//! tear anything down - the function surfaces it as an opaque 500 on every
//! invocation, keeping the harness alive.

use portico_config::{
    Config, ConfigLayer, RequestContentOptions, ResponseContentOptions, SerializerBinding,
    Severity,
};
use portico_core::{Event, Fault, FunctionContext, Handler, Response};
use portico_pipeline::Engine;
use portico_telemetry::{LogLevel, LoggerFactory};
use regex::Regex;
use std::sync::Arc;

/// Shared configuration for a family of wrapped handlers.
///
/// # Example
///
/// ```
/// use portico::{res, Api};
/// use portico_config::ConfigLayer;
/// use portico_core::{Event, FunctionContext, Invocation};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let api = Api::new();
/// let function = api.function(ConfigLayer::new(), |_invocation: Invocation| async move {
///     Ok(res::ok(json!({ "message": "Hello World" })))
/// });
///
/// let event = Event::from_value(json!({ "version": "2.0", "rawPath": "/" })).unwrap();
/// let response = function.invoke(event, FunctionContext::default()).await;
/// assert_eq!(response.status_code, 200);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct Api {
    base: Config,
}

impl Api {
    /// An api with framework defaults only.
    #[must_use]
    pub fn new() -> Self {
        Self::with_family(ConfigLayer::new())
    }

    /// An api with a family layer resolved over the framework defaults.
    #[must_use]
    pub fn with_family(family: ConfigLayer) -> Self {
        Self {
            base: Config::resolve([Self::defaults(), family]),
        }
    }

    /// The framework defaults layer: info-level tracing logger, response
    /// validation at `error` severity, JSON as the one negotiable request
    /// media type, and a JSON response serializer.
    #[must_use]
    pub fn defaults() -> ConfigLayer {
        let json_pattern =
            Regex::new("^application/json$").expect("literal pattern always compiles");
        ConfigLayer::new()
            .logger(LoggerFactory::tracing())
            .log_level(LogLevel::Info)
            .enable_profiling(false)
            .metrics(false)
            .validate_responses(Severity::Error)
            .request_content(RequestContentOptions {
                available_media_types: Some(vec!["application/json".to_owned()]),
                fail_on_mismatch: None,
            })
            .response_content(ResponseContentOptions {
                serializers: vec![SerializerBinding::new(json_pattern, |body| {
                    Ok(serde_json::to_string(body)?)
                })],
                default_content_type: Some("application/json".to_owned()),
            })
    }

    /// The resolved base configuration (defaults under the family layer).
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.base
    }

    /// Wraps a handler with this api's configuration plus one per-function
    /// layer.
    #[must_use]
    pub fn function(&self, layer: ConfigLayer, handler: impl Handler + 'static) -> Function {
        Function::new(self.base.merged(layer), Arc::new(handler))
    }
}

impl Default for Api {
    fn default() -> Self {
        Self::new()
    }
}

/// One wrapped handler: resolved configuration plus the assembled engine.
pub struct Function {
    config: Config,
    engine: Result<Engine, Fault>,
}

impl Function {
    /// Binds a handler to a fully resolved configuration.
    #[must_use]
    pub fn new(config: Config, handler: Arc<dyn Handler>) -> Self {
        let engine = Engine::from_config(&config, handler);
        Self { config, engine }
    }

    /// The resolved configuration this function runs under.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The assembled stage names, when assembly succeeded.
    #[must_use]
    pub fn stage_names(&self) -> Option<Vec<&'static str>> {
        self.engine.as_ref().ok().map(Engine::stage_names)
    }

    /// Handles one invocation. Never fails: every fault, including a
    /// definition-time configuration defect, becomes a well-formed
    /// response.
    pub async fn invoke(&self, event: Event, context: FunctionContext) -> Response {
        match &self.engine {
            Ok(engine) => engine.invoke(event, context).await,
            Err(fault) => {
                let factory = self
                    .config
                    .logger_factory()
                    .ok()
                    .flatten()
                    .unwrap_or_else(LoggerFactory::tracing);
                factory.make().error(&fault.to_string());
                fault.to_response()
            }
        }
    }
}
