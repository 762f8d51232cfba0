//! The per-invocation mutable record.
//!
//! One [`Exchange`] is created per invocation and owned exclusively by that
//! run: stages fill in the parsed parts on the way in, the handler's result
//! (or a short-circuit response) lands in the response slot, and `after`
//! hooks decorate it on the way out. It is never pooled, reused, or shared
//! across concurrent invocations.

use crate::context::FunctionContext;
use crate::event::Event;
use crate::handler::Invocation;
use crate::response::Response;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::time::{Duration, Instant};

/// Per-invocation state flowing through the pipeline.
#[derive(Debug)]
pub struct Exchange {
    event: Event,
    context: FunctionContext,
    started_at: Instant,
    headers: IndexMap<String, String>,
    body: Option<Value>,
    path_parameters: Value,
    query_parameters: Value,
    authorizer: Option<Value>,
    response_media_type: Option<String>,
    response: Option<Response>,
    handler_responded: bool,
}

impl Exchange {
    /// Creates a fresh exchange for one invocation.
    #[must_use]
    pub fn new(event: Event, context: FunctionContext) -> Self {
        Self {
            event,
            context,
            started_at: Instant::now(),
            headers: IndexMap::new(),
            body: None,
            path_parameters: Value::Object(Map::new()),
            query_parameters: Value::Object(Map::new()),
            authorizer: None,
            response_media_type: None,
            response: None,
            handler_responded: false,
        }
    }

    /// The raw inbound event.
    #[must_use]
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// The platform context.
    #[must_use]
    pub fn context(&self) -> &FunctionContext {
        &self.context
    }

    /// Elapsed time since the exchange was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// The normalized (lowercase-keyed) request headers.
    #[must_use]
    pub fn headers(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    /// Looks up a normalized header by name (callers pass any casing).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Replaces the normalized header map. Keys must already be lowercase.
    pub fn set_headers(&mut self, headers: IndexMap<String, String>) {
        self.headers = headers;
    }

    /// The parsed request body, when a parser stage has run.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// The parsed body, or `Null` when absent. The shape validation runs
    /// against.
    #[must_use]
    pub fn body_or_null(&self) -> Value {
        self.body.clone().unwrap_or(Value::Null)
    }

    /// Sets the parsed request body.
    pub fn set_body(&mut self, body: Value) {
        self.body = Some(body);
    }

    /// The path parameters (always an object).
    #[must_use]
    pub fn path_parameters(&self) -> &Value {
        &self.path_parameters
    }

    /// Sets the path parameters.
    pub fn set_path_parameters(&mut self, parameters: Value) {
        self.path_parameters = parameters;
    }

    /// The query parameters (always an object).
    #[must_use]
    pub fn query_parameters(&self) -> &Value {
        &self.query_parameters
    }

    /// Sets the query parameters.
    pub fn set_query_parameters(&mut self, parameters: Value) {
        self.query_parameters = parameters;
    }

    /// The authorizer context, when the event carried one.
    #[must_use]
    pub fn authorizer(&self) -> Option<&Value> {
        self.authorizer.as_ref()
    }

    /// Sets the authorizer context.
    pub fn set_authorizer(&mut self, authorizer: Value) {
        self.authorizer = Some(authorizer);
    }

    /// The media type negotiated for the response, if any.
    #[must_use]
    pub fn response_media_type(&self) -> Option<&str> {
        self.response_media_type.as_deref()
    }

    /// Records the negotiated response media type.
    pub fn set_response_media_type(&mut self, media_type: impl Into<String>) {
        self.response_media_type = Some(media_type.into());
    }

    /// The in-flight response, once set.
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Mutable access to the in-flight response.
    pub fn response_mut(&mut self) -> Option<&mut Response> {
        self.response.as_mut()
    }

    /// Sets (or replaces) the response. Setting a response from a `before`
    /// hook short-circuits the run.
    pub fn set_response(&mut self, response: Response) {
        self.response = Some(response);
    }

    /// Installs the handler's response, marking its provenance so stages
    /// that only apply to handler output (response validation) can tell it
    /// apart from short-circuits and fault conversions.
    pub fn set_handler_response(&mut self, response: Response) {
        self.handler_responded = true;
        self.response = Some(response);
    }

    /// Whether the current response came from the handler.
    #[must_use]
    pub const fn handler_responded(&self) -> bool {
        self.handler_responded
    }

    /// Takes the response out of the exchange at the end of the run.
    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }

    /// Builds the typed view the handler receives.
    #[must_use]
    pub fn to_invocation(&self) -> Invocation {
        Invocation {
            body: self.body_or_null(),
            path: self.path_parameters.clone(),
            query: self.query_parameters.clone(),
            authorizer: self.authorizer.clone().unwrap_or(Value::Null),
            event: self.event.clone(),
            context: self.context.clone(),
        }
    }
}
