//! # Portico
//!
//! A configurable processing pipeline around single-invocation cloud
//! functions.
//!
//! Portico wraps a handler with content negotiation, body parsing, schema
//! validation of the request and response, CORS and security headers,
//! content encoding, and structured failure translation - all driven by a
//! layered configuration resolved once per handler definition:
//!
//! ```text
//! framework defaults  <  family layer  <  per-function layer
//! ```
//!
//! ```
//! use portico::{res, Api};
//! use portico_config::{ConfigLayer, CorsOptions};
//! use portico_core::{Event, FunctionContext, Invocation, Schema};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let api = Api::with_family(ConfigLayer::new().cors(CorsOptions {
//!     origin: Some("*".to_owned()),
//!     ..CorsOptions::default()
//! }));
//!
//! let function = api.function(
//!     ConfigLayer::new().request_schema(
//!         Schema::json_schema(&json!({
//!             "type": "object",
//!             "required": ["id"],
//!             "properties": { "id": { "type": "number" } }
//!         }))
//!         .unwrap(),
//!     ),
//!     |invocation: Invocation| async move { Ok(res::ok(invocation.body)) },
//! );
//!
//! let event = Event::from_value(json!({
//!     "version": "2.0",
//!     "rawPath": "/things",
//!     "headers": { "content-type": "application/json" },
//!     "body": "{\"id\":1}"
//! }))
//! .unwrap();
//! let response = function.invoke(event, FunctionContext::default()).await;
//! assert_eq!(response.status_code, 200);
//! # });
//! ```
//!
//! The heavy lifting lives in the member crates, re-exported here:
//!
//! - [`portico_core`] - event envelope, exchange, response helpers, fault
//!   taxonomy, schema adapter, stage and handler contracts
//! - [`portico_config`] - the layered configuration resolver
//! - [`portico_pipeline`] - stage implementations and the invocation engine
//! - [`portico_telemetry`] - injected logging, metrics, profiling

#![doc(html_root_url = "https://docs.rs/portico/0.1.0")]
#![warn(missing_docs)]

mod api;

pub use api::{Api, Function};
pub use portico_core::response::res;

pub use portico_config;
pub use portico_core;
pub use portico_pipeline;
pub use portico_telemetry;

/// The commonly needed names in one import.
pub mod prelude {
    pub use crate::api::{Api, Function};
    pub use crate::res;
    pub use portico_config::{
        ConfigLayer, CorsOptions, EncodingOptions, RequestContentOptions,
        ResponseContentOptions, SecurityOptions, SerializerBinding, Severity, WarmupOptions,
    };
    pub use portico_core::{
        Event, Fault, FunctionContext, Handler, HandlerResult, Invocation, Response, Schema,
        Stage,
    };
    pub use portico_telemetry::{LogLevel, LoggerFactory};
}
