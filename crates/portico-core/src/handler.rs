//! The handler contract and the typed view it receives.
//!
//! A handler is the user's business logic: it gets an [`Invocation`] (the
//! parsed parts of the exchange plus the platform context) and returns a
//! [`Response`]. Handlers are async; a synchronous handler is just one that
//! never awaits. Errors are opaque to the pipeline - they become a 500 at
//! the engine boundary without exposing the message.

use crate::context::FunctionContext;
use crate::event::Event;
use crate::response::Response;
use crate::stage::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;

/// What a handler returns.
pub type HandlerResult = Result<Response, anyhow::Error>;

/// The typed view of the exchange a handler receives.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// The parsed request body (`Null` when absent).
    pub body: Value,
    /// The path parameters (an object).
    pub path: Value,
    /// The query parameters (an object).
    pub query: Value,
    /// The authorizer context (`Null` when absent).
    pub authorizer: Value,
    /// The raw inbound event, for anything the view does not surface.
    pub event: Event,
    /// The platform context.
    pub context: FunctionContext,
}

impl Invocation {
    /// Deserializes the body into a concrete type.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error; propagating it with `?` turns it
    /// into a handler fault (500).
    pub fn parse_body<T: DeserializeOwned>(&self) -> Result<T, anyhow::Error> {
        Ok(serde_json::from_value(self.body.clone())?)
    }

    /// Deserializes the path parameters into a concrete type.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error.
    pub fn parse_path<T: DeserializeOwned>(&self) -> Result<T, anyhow::Error> {
        Ok(serde_json::from_value(self.path.clone())?)
    }

    /// Deserializes the query parameters into a concrete type.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error.
    pub fn parse_query<T: DeserializeOwned>(&self) -> Result<T, anyhow::Error> {
        Ok(serde_json::from_value(self.query.clone())?)
    }
}

/// The user handler invoked once per request.
///
/// Implemented for any `Fn(Invocation) -> impl Future<Output = HandlerResult>`,
/// so plain async functions work directly:
///
/// ```
/// use portico_core::handler::{HandlerResult, Invocation};
/// use portico_core::response::res;
/// use serde_json::json;
///
/// async fn hello(_invocation: Invocation) -> HandlerResult {
///     Ok(res::ok(json!({ "message": "Hello World" })))
/// }
/// ```
pub trait Handler: Send + Sync {
    /// Handles one invocation.
    fn call(&self, invocation: Invocation) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Invocation) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, invocation: Invocation) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(invocation))
    }
}
